use std::sync::Arc;

use actlet::prelude::*;
use chrono::NaiveDate;
use chrono::Timelike;
use clap::Args;

use arema_core::api::HttpApiClient;
use arema_core::batcher::ProgramBatcher;
use arema_core::clock::SystemClock;
use arema_core::clock::WallClock;
use arema_core::config::Config;
use arema_core::error::Error;
use arema_core::loader::PageLoader;
use arema_core::services::Services;
use arema_core::store::ProgramStore;
use arema_core::store::QueryTimetable;
use arema_core::timetable::BroadcastState;
use arema_core::timetable::format_japanese_datetime;
use arema_core::timetable::program_height;
use arema_core::timetable_page::QueryColumnWidths;
use arema_core::timetable_page::TimetablePage;
use chrono_jst::Jst;

/// Show the timetable of a day.
///
/// Programs are listed for each channel in order of their start time,
/// together with their broadcast state at this moment.
#[derive(Args)]
#[clap(verbatim_doc_comment)]
pub struct CommandLine {
    /// Date in JST (YYYY-MM-DD).
    ///
    /// Today is used if this option is not specified.
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub async fn main(config: Arc<Config>, cl: &CommandLine) -> Result<(), Error> {
    let system = System::new();
    let result = show(config, cl, &system).await;
    system.shutdown().await;
    result
}

async fn show(config: Arc<Config>, cl: &CommandLine, system: &System) -> Result<(), Error> {
    let api = HttpApiClient::new(&config);
    let batcher = system
        .spawn_actor(ProgramBatcher::new(config.clone(), api.clone()))
        .await;
    let store = system.spawn_actor(ProgramStore::new()).await;
    let page = system
        .spawn_actor(TimetablePage::new(config.clone()))
        .await;
    let loader = PageLoader::new(Services::new(api, batcher), store.clone());

    let date = cl.date.unwrap_or_else(Jst::today);
    loader.load_timetable(date).await?;

    let grid = store.call(QueryTimetable).await?;
    let widths = page.call(QueryColumnWidths).await?;
    let now_ms = SystemClock.now_ms();

    println!("{date}");
    for entry in grid.values() {
        println!(
            "{} ({}) {}px",
            entry.channel.name,
            entry.channel.id.as_str(),
            widths.get(&entry.channel.id)
        );
        for program in entry.programs.iter() {
            let state = BroadcastState::classify(program, now_ms);
            println!(
                "  {} - {:02}:{:02} {:>8} {} ({:.0}px)",
                format_japanese_datetime(&program.start_at),
                program.end_at.hour(),
                program.end_at.minute(),
                state.to_string(),
                program.title,
                program_height(program, config.timetable.height_one_hour),
            );
        }
    }

    Ok(())
}
