//! Smoke-tests the client against a running stampkeeper server: creates a
//! stamp, edits it inline, exercises the box upsert and the draft-row
//! lifecycle, optionally uploads an image, then cleans up after itself.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt};

use client::{
    api::Api,
    boxes::{self, BoxDirectory},
    config::Config,
    instances::{CopiesTable, RowSave},
    prefs::{PrefStore, preferred_view_path, query_for_request},
    stamps::{FormField, NewStampForm, StampDetail},
    sync::{Coercion, Signal},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base URL; overrides STAMPKEEPER_URL.
    #[arg(long)]
    server: Option<String>,

    /// Image file to upload to the smoke-test stamp.
    #[arg(long)]
    image: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = Config::load();
    let server = args.server.unwrap_or_else(|| config.server_url.clone());
    let api = Api::new(&server);

    println!("Target server: {server}");

    let prefs = PrefStore::from_config(&config).load();
    println!("Preferred view: {}", preferred_view_path(&prefs));

    let listing = api
        .stamps_view(prefs.default_view, &query_for_request(&prefs))
        .await
        .context("fetching stamps view")?;
    println!("Stamps view fragment: {} bytes\n", listing.len());

    let mut directory = BoxDirectory::fetch(&api).await.context("fetching boxes")?;
    println!("Known boxes: {}", directory.boxes().len());

    let mut signals = Vec::new();
    let scratch = boxes::create_box(&api, &mut directory, "Tester Shelf", &mut signals)
        .await
        .context("creating box")?;
    let renamed = boxes::rename_box(
        &api,
        &mut directory,
        &scratch.id,
        "Tester Shelf (renamed)",
        &mut signals,
    )
    .await
    .context("renaming box")?;
    println!("Created and renamed box {}", renamed.name);
    boxes::delete_box(&api, &mut directory, &renamed.id, &mut signals)
        .await
        .context("deleting box")?;

    let mut form = NewStampForm::new();
    form.set_field(FormField::Name, "Smoke Test Stamp");
    form.set_field(FormField::Series, "Tester");
    form.add_tag("smoke");

    let stamp = form.create(&api).await.context("creating stamp")?;
    println!("Created stamp {} ({})", stamp.name, stamp.id);

    let mut detail = StampDetail::new(stamp, directory);

    detail
        .save_field(&api, "notes", Coercion::Text, "  created by the tester  ")
        .await
        .context("saving notes")?;
    detail
        .save_field(&api, "is_owned", Coercion::Checkbox, "true")
        .await
        .context("saving ownership")?;
    detail
        .assign_box(&api, "Tester Box")
        .await
        .context("assigning box")?;
    println!("Stamp is now marked: {}", detail.owned_label());

    detail.add_tag(&api, "airmail").await.context("adding tag")?;
    detail
        .remove_tag(&api, "airmail")
        .await
        .context("removing tag")?;

    let mut table = CopiesTable::new(detail.stamp.id.clone(), detail.stamp.instances.clone());

    let draft_markup = api
        .new_instance_row(&detail.stamp.id)
        .await
        .context("fetching draft row fragment")?;
    println!("Draft row fragment: {} bytes", draft_markup.len());

    table.add_draft();
    table.edit_draft(|draft| {
        draft.condition = "Mint".to_string();
        draft.box_name = "Tester Box".to_string();
        draft.quantity = 2;
    });
    table
        .save_draft(&api, &mut detail.boxes)
        .await
        .context("saving draft row")?;
    println!(
        "Copies: {} group(s), {} total",
        table.group_count(),
        table.total_copies()
    );

    let row_id = table.rows()[0].id.clone();
    table
        .save_row_field(&api, &row_id, "condition", Coercion::Text, "Fine")
        .await
        .context("saving condition")?;
    table.adjust_quantity(&api, &row_id, 1).await?;

    // Driving quantity to zero makes the server delete the instance (204).
    let outcome = table.adjust_quantity(&api, &row_id, -3).await?;
    if outcome == RowSave::RowRemoved {
        println!(
            "Server deleted the emptied instance, draft restored: {}",
            table.draft().is_some()
        );
    }

    // The auto-created draft becomes one more copy, deleted the direct way.
    table.edit_draft(|draft| {
        draft.condition = "Used".to_string();
        draft.quantity = 1;
    });
    table
        .save_draft(&api, &mut detail.boxes)
        .await
        .context("saving second draft")?;
    let row_id = table.rows()[0].id.clone();
    table
        .delete_row(&api, &row_id)
        .await
        .context("deleting instance group")?;

    if let Some(path) = args.image {
        upload_image(&api, &mut detail, &path).await?;
        detail
            .remove_image(&api)
            .await
            .context("removing image")?;
        println!("Image removed again");
    }

    signals.extend(detail.drain_signals());
    signals.extend(table.drain_signals());
    if signals.contains(&Signal::BoxListChanged) {
        let sidebar = api.boxes_view().await.context("refreshing box list")?;
        println!("Refreshed sidebar box list: {} bytes", sidebar.len());
    }

    let fragment = api.stamp_detail(&detail.stamp.id).await?;
    println!("Detail fragment: {} bytes", fragment.len());

    detail.delete(&api).await.context("deleting stamp")?;
    println!("Cleaned up.");

    Ok(())
}

async fn upload_image(api: &Api, detail: &mut StampDetail, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.jpg".to_string());

    let pb = ProgressBar::new(bytes.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    pb.set_message(format!("Uploading {filename}"));

    let ticker = pb.clone();
    let image_url = detail
        .upload_image(api, filename, mime_for(path), bytes, move |sent, _total| {
            ticker.set_position(sent);
        })
        .await
        .context("uploading image")?;

    pb.finish_with_message("Done");
    println!("Image stored at {image_url}");

    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
