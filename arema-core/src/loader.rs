use actlet::prelude::*;
use chrono::NaiveDate;

use crate::api::ApiClient;
use crate::batcher::FetchProgram;
use crate::error::Error;
use crate::models::*;
use crate::services::Services;
use crate::store::UpsertEntities;
use crate::timetable::TimetableWindow;

/// Loads the data of a page and puts it into the store.
///
/// Requests of a page are issued concurrently and the results are applied to
/// the store with a single `UpsertEntities`.  A failure of a request only
/// leaves its part missing.  An error is returned only when the store is
/// unavailable.
#[derive(Clone)]
pub struct PageLoader<A, B, S> {
    services: Services<A, B>,
    store: S,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgramPage {
    pub program: Program,
    pub module: Option<RecommendedModule>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodePage {
    pub episode: Episode,
    pub series: Option<Series>,
    pub module: Option<RecommendedModule>,
}

impl<A, B, S> PageLoader<A, B, S>
where
    A: ApiClient,
    B: Call<FetchProgram> + Send + Sync,
    S: Call<UpsertEntities> + Send + Sync,
{
    pub fn new(services: Services<A, B>, store: S) -> Self {
        PageLoader { services, store }
    }

    /// Loads channels and programs broadcast on `date`.
    pub async fn load_timetable(&self, date: NaiveDate) -> Result<Entities, Error> {
        let window = TimetableWindow::for_date(date);
        let (channels, programs) = futures::join!(
            self.services.fetch_channels(),
            self.services.fetch_timetable(&window),
        );
        tracing::debug!(
            %date,
            channels = channels.len(),
            programs = programs.len(),
            "Loaded timetable"
        );
        let entities = Entities {
            channels,
            programs,
            ..Default::default()
        };
        self.upsert(entities.clone()).await?;
        Ok(entities)
    }

    /// Loads a program, every program and the modules recommended for it.
    ///
    /// Every program is needed for looking up the next program when the
    /// program ends.
    pub async fn load_program_page(
        &self,
        program_id: &ProgramId,
    ) -> Result<Option<ProgramPage>, Error> {
        let (detail, programs, modules) = futures::join!(
            self.services.fetch_program(program_id.clone()),
            self.services.fetch_programs(),
            self.services.fetch_recommended_modules(program_id.as_str()),
        );

        let mut entities = Entities::default();
        for detail in programs {
            detail.collect(&mut entities);
        }
        for module in modules {
            module.collect(&mut entities);
        }
        let module = entities.modules.first().cloned();
        let program = detail.map(|detail| {
            let program = detail.program.clone();
            // Collected last so that it wins over the one in the list.
            detail.collect(&mut entities);
            program
        });
        self.upsert(entities).await?;

        match program {
            Some(program) => Ok(Some(ProgramPage { program, module })),
            None => {
                tracing::warn!(%program_id, "Program unavailable");
                Ok(None)
            }
        }
    }

    /// Loads an episode, its series and the modules recommended for it.
    pub async fn load_episode_page(
        &self,
        episode_id: &EpisodeId,
    ) -> Result<Option<EpisodePage>, Error> {
        let (detail, modules) = futures::join!(
            self.services.fetch_episode(episode_id),
            self.services.fetch_recommended_modules(episode_id.as_str()),
        );

        let mut entities = Entities::default();
        for module in modules {
            module.collect(&mut entities);
        }
        let module = entities.modules.first().cloned();
        let episode = detail.map(|detail| {
            let episode = detail.episode.clone();
            detail.collect(&mut entities);
            episode
        });
        // Nested episodes carry their series without episodes.  The outer one
        // is collected last.
        let series = episode.as_ref().and_then(|episode| {
            entities
                .series
                .iter()
                .rfind(|series| series.id == episode.series_id)
                .cloned()
        });
        self.upsert(entities).await?;

        match episode {
            Some(episode) => Ok(Some(EpisodePage {
                episode,
                series,
                module,
            })),
            None => {
                tracing::warn!(%episode_id, "Episode unavailable");
                Ok(None)
            }
        }
    }

    /// Loads a series and its episodes.
    pub async fn load_series_page(&self, series_id: &SeriesId) -> Result<Option<Series>, Error> {
        let detail = match self.services.fetch_series(series_id).await {
            Some(detail) => detail,
            None => {
                tracing::warn!(%series_id, "Series unavailable");
                return Ok(None);
            }
        };
        let mut entities = Entities::default();
        detail.collect(&mut entities);
        let series = entities
            .series
            .iter()
            .rfind(|series| series.id == *series_id)
            .cloned();
        self.upsert(entities).await?;
        Ok(series)
    }

    async fn upsert(&self, entities: Entities) -> Result<(), Error> {
        if entities.is_empty() {
            return Ok(());
        }
        self.store.call(UpsertEntities(entities)).await?;
        Ok(())
    }
}

// </coverage:exclude>
