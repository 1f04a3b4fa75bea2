use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actlet::prelude::*;

use crate::column_width::ColumnWidths;
use crate::config::Config;
use crate::error::Error;
use crate::file_util;
use crate::models::ChannelId;
use crate::models::ProgramId;
use crate::timer::TimerId;
use crate::timer::Timers;

/// UI state of the timetable page.
///
/// Column widths are written synchronously.  When `column-widths-path` is
/// configured, they are also saved `persist-delay` after the last change and
/// loaded when the actor starts.
pub struct TimetablePage {
    column_widths: ColumnWidths,
    selected_program_id: Option<ProgramId>,
    shown_new_feature_dialog: bool,
    column_widths_path: Option<PathBuf>,
    persist_delay: Duration,
    timers: Timers<()>,
}

impl TimetablePage {
    pub fn new(config: Arc<Config>) -> Self {
        TimetablePage {
            column_widths: Default::default(),
            selected_program_id: None,
            shown_new_feature_dialog: true,
            column_widths_path: config.timetable.column_widths_path.clone(),
            persist_delay: config.timetable.persist_delay,
            timers: Timers::new(),
        }
    }

    fn load_column_widths(&mut self) {
        let path = match self.column_widths_path.as_ref() {
            Some(path) => path,
            None => return,
        };
        if !path.exists() {
            tracing::debug!(?path, "No column widths saved");
            return;
        }
        match file_util::load_json::<ColumnWidths, _>(path) {
            Ok(column_widths) => {
                self.column_widths = column_widths.normalize();
                tracing::info!(?path, len = self.column_widths.len(), "Loaded column widths");
            }
            Err(err) => {
                tracing::warn!(?path, %err, "Failed to load column widths, ignored");
            }
        }
    }

    fn schedule_persist(&mut self, ctx: &Context<Self>) {
        if self.column_widths_path.is_none() {
            return;
        }
        let addr = ctx.address().clone();
        self.timers.arm(ctx, (), self.persist_delay, move |timer_id| async move {
            addr.emit(PersistExpired { timer_id }).await;
        });
    }

    fn persist(&self) -> Result<(), Error> {
        match self.column_widths_path.as_ref() {
            Some(path) => file_util::save_json(&self.column_widths, path),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Actor for TimetablePage {
    async fn started(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Started");
        self.load_column_widths();
    }

    async fn stopping(&mut self, _ctx: &mut Context<Self>) {
        // Save changes made within the last `persist-delay`.
        if self.timers.cancel(&()) {
            if let Err(err) = self.persist() {
                tracing::error!(%err, "Failed to save column widths");
            }
        }
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Stopped");
    }
}

// change column width

#[derive(Message)]
#[reply(u32)]
pub struct ChangeColumnWidth {
    pub channel_id: ChannelId,
    pub delta: i32,
}

#[async_trait]
impl Handler<ChangeColumnWidth> for TimetablePage {
    async fn handle(&mut self, msg: ChangeColumnWidth, ctx: &mut Context<Self>) -> u32 {
        tracing::debug!(msg.name = "ChangeColumnWidth", %msg.channel_id, msg.delta);
        let width = self.column_widths.change(msg.channel_id, msg.delta);
        self.schedule_persist(ctx);
        width
    }
}

// query column width

#[derive(Message)]
#[reply(u32)]
pub struct QueryColumnWidth {
    pub channel_id: ChannelId,
}

#[async_trait]
impl Handler<QueryColumnWidth> for TimetablePage {
    async fn handle(&mut self, msg: QueryColumnWidth, _ctx: &mut Context<Self>) -> u32 {
        tracing::debug!(msg.name = "QueryColumnWidth", %msg.channel_id);
        self.column_widths.get(&msg.channel_id)
    }
}

// query column widths

#[derive(Message)]
#[reply(ColumnWidths)]
pub struct QueryColumnWidths;

#[async_trait]
impl Handler<QueryColumnWidths> for TimetablePage {
    async fn handle(&mut self, _msg: QueryColumnWidths, _ctx: &mut Context<Self>) -> ColumnWidths {
        tracing::debug!(msg.name = "QueryColumnWidths");
        self.column_widths.clone()
    }
}

// select program

/// Selects a program, or clears the selection with `None`.
#[derive(Message)]
pub struct SelectProgram(pub Option<ProgramId>);

#[async_trait]
impl Handler<SelectProgram> for TimetablePage {
    async fn handle(&mut self, msg: SelectProgram, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "SelectProgram", program_id = ?msg.0);
        self.selected_program_id = msg.0;
    }
}

// query selected program

#[derive(Message)]
#[reply(Option<ProgramId>)]
pub struct QuerySelectedProgram;

#[async_trait]
impl Handler<QuerySelectedProgram> for TimetablePage {
    async fn handle(
        &mut self,
        _msg: QuerySelectedProgram,
        _ctx: &mut Context<Self>,
    ) -> Option<ProgramId> {
        tracing::debug!(msg.name = "QuerySelectedProgram");
        self.selected_program_id.clone()
    }
}

// close new feature dialog

#[derive(Message)]
pub struct CloseNewFeatureDialog;

#[async_trait]
impl Handler<CloseNewFeatureDialog> for TimetablePage {
    async fn handle(&mut self, _msg: CloseNewFeatureDialog, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "CloseNewFeatureDialog");
        self.shown_new_feature_dialog = false;
    }
}

// query new feature dialog

#[derive(Message)]
#[reply(bool)]
pub struct QueryNewFeatureDialog;

#[async_trait]
impl Handler<QueryNewFeatureDialog> for TimetablePage {
    async fn handle(&mut self, _msg: QueryNewFeatureDialog, _ctx: &mut Context<Self>) -> bool {
        tracing::debug!(msg.name = "QueryNewFeatureDialog");
        self.shown_new_feature_dialog
    }
}

// persist expired

#[derive(Message)]
struct PersistExpired {
    timer_id: TimerId,
}

#[async_trait]
impl Handler<PersistExpired> for TimetablePage {
    async fn handle(&mut self, msg: PersistExpired, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "PersistExpired", %msg.timer_id);
        if !self.timers.expire(&(), msg.timer_id) {
            return;
        }
        if let Err(err) = self.persist() {
            tracing::error!(%err, "Failed to save column widths");
        }
    }
}

// </coverage:exclude>
