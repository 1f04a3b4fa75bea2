use std::collections::HashMap;
use std::sync::Arc;

use actlet::prelude::*;
use chrono::DateTime;
use chrono_jst::Jst;
use indexmap::IndexMap;

use crate::models::*;
use crate::timetable;
use crate::timetable::TimetableGrid;

/// A normalized in-memory store of entities.
///
/// Entities are replaced as a whole by ID and never evicted.  Enumerations
/// follow the order of first insertion.
#[derive(Default)]
pub struct ProgramStore {
    channels: IndexMap<ChannelId, Channel>,
    programs: IndexMap<ProgramId, Program>,
    episodes: IndexMap<EpisodeId, Episode>,
    series: IndexMap<SeriesId, Series>,
    modules: IndexMap<ModuleId, RecommendedModule>,
    references: HashMap<String, Vec<ModuleId>>,
    // Bumped when channels or programs change.
    revision: u64,
    timetable: Option<(u64, Arc<TimetableGrid>)>,
    emitters: EmitterRegistry<TimetableUpdated>,
}

impl ProgramStore {
    pub fn new() -> Self {
        Default::default()
    }

    fn upsert(&mut self, entities: Entities) -> bool {
        let mut changed = false;

        for channel in entities.channels {
            changed |= upsert_entity(&mut self.channels, channel.id.clone(), channel);
        }
        for program in entities.programs {
            changed |= upsert_entity(&mut self.programs, program.id.clone(), program);
        }
        for episode in entities.episodes {
            self.episodes.insert(episode.id.clone(), episode);
        }
        for series in entities.series {
            self.series.insert(series.id.clone(), series);
        }

        let mut references: IndexMap<String, Vec<ModuleId>> = IndexMap::new();
        for module in entities.modules {
            references
                .entry(module.reference_id.clone())
                .or_default()
                .push(module.id.clone());
            self.modules.insert(module.id.clone(), module);
        }
        // The latest response for a reference replaces the previous one.
        self.references.extend(references);

        if changed {
            self.revision += 1;
            tracing::debug!(revision = self.revision, "Timetable changed");
        }
        changed
    }

    fn timetable(&mut self) -> Arc<TimetableGrid> {
        if let Some((revision, grid)) = self.timetable.as_ref() {
            if *revision == self.revision {
                return grid.clone();
            }
        }
        let grid = Arc::new(timetable::project(
            self.channels.values(),
            self.programs.values(),
        ));
        self.timetable = Some((self.revision, grid.clone()));
        grid
    }

    fn contiguous_successor(&self, channel_id: &ChannelId, end_at: &DateTime<Jst>) -> Option<&Program> {
        self.programs
            .values()
            .find(|program| program.channel_id == *channel_id && program.start_at == *end_at)
    }

    fn recommended_modules(&self, reference_id: &str) -> Vec<RecommendedModule> {
        self.references
            .get(reference_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.modules.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn upsert_entity<K, V>(map: &mut IndexMap<K, V>, key: K, value: V) -> bool
where
    K: std::hash::Hash + Eq,
    V: PartialEq,
{
    match map.get_mut(&key) {
        Some(current) if *current == value => false,
        Some(current) => {
            *current = value;
            true
        }
        None => {
            map.insert(key, value);
            true
        }
    }
}

#[async_trait]
impl Actor for ProgramStore {
    async fn started(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Started");
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Stopped");
    }
}

// upsert entities

#[derive(Message)]
#[reply()]
pub struct UpsertEntities(pub Entities);

#[async_trait]
impl Handler<UpsertEntities> for ProgramStore {
    async fn handle(&mut self, msg: UpsertEntities, _ctx: &mut Context<Self>) {
        tracing::debug!(
            msg.name = "UpsertEntities",
            channels = msg.0.channels.len(),
            programs = msg.0.programs.len(),
            episodes = msg.0.episodes.len(),
            series = msg.0.series.len(),
            modules = msg.0.modules.len(),
        );
        if self.upsert(msg.0) {
            self.emitters
                .emit(TimetableUpdated {
                    revision: self.revision,
                })
                .await;
        }
    }
}

// query channel

#[derive(Message)]
#[reply(Option<Channel>)]
pub struct QueryChannel {
    pub channel_id: ChannelId,
}

#[async_trait]
impl Handler<QueryChannel> for ProgramStore {
    async fn handle(&mut self, msg: QueryChannel, _ctx: &mut Context<Self>) -> Option<Channel> {
        tracing::debug!(msg.name = "QueryChannel", %msg.channel_id);
        self.channels.get(&msg.channel_id).cloned()
    }
}

// query channels

#[derive(Message)]
#[reply(Vec<Channel>)]
pub struct QueryChannels;

#[async_trait]
impl Handler<QueryChannels> for ProgramStore {
    async fn handle(&mut self, _msg: QueryChannels, _ctx: &mut Context<Self>) -> Vec<Channel> {
        tracing::debug!(msg.name = "QueryChannels");
        self.channels.values().cloned().collect()
    }
}

// query program

#[derive(Message)]
#[reply(Option<Program>)]
pub struct QueryProgram {
    pub program_id: ProgramId,
}

#[async_trait]
impl Handler<QueryProgram> for ProgramStore {
    async fn handle(&mut self, msg: QueryProgram, _ctx: &mut Context<Self>) -> Option<Program> {
        tracing::debug!(msg.name = "QueryProgram", %msg.program_id);
        self.programs.get(&msg.program_id).cloned()
    }
}

// query programs

#[derive(Message)]
#[reply(Vec<Program>)]
pub struct QueryPrograms;

#[async_trait]
impl Handler<QueryPrograms> for ProgramStore {
    async fn handle(&mut self, _msg: QueryPrograms, _ctx: &mut Context<Self>) -> Vec<Program> {
        tracing::debug!(msg.name = "QueryPrograms");
        self.programs.values().cloned().collect()
    }
}

// query episode

#[derive(Message)]
#[reply(Option<Episode>)]
pub struct QueryEpisode {
    pub episode_id: EpisodeId,
}

#[async_trait]
impl Handler<QueryEpisode> for ProgramStore {
    async fn handle(&mut self, msg: QueryEpisode, _ctx: &mut Context<Self>) -> Option<Episode> {
        tracing::debug!(msg.name = "QueryEpisode", %msg.episode_id);
        self.episodes.get(&msg.episode_id).cloned()
    }
}

// query series

#[derive(Message)]
#[reply(Option<Series>)]
pub struct QuerySeries {
    pub series_id: SeriesId,
}

#[async_trait]
impl Handler<QuerySeries> for ProgramStore {
    async fn handle(&mut self, msg: QuerySeries, _ctx: &mut Context<Self>) -> Option<Series> {
        tracing::debug!(msg.name = "QuerySeries", %msg.series_id);
        self.series.get(&msg.series_id).cloned()
    }
}

// query recommended modules

#[derive(Message)]
#[reply(Vec<RecommendedModule>)]
pub struct QueryRecommendedModules {
    pub reference_id: String,
}

#[async_trait]
impl Handler<QueryRecommendedModules> for ProgramStore {
    async fn handle(
        &mut self,
        msg: QueryRecommendedModules,
        _ctx: &mut Context<Self>,
    ) -> Vec<RecommendedModule> {
        tracing::debug!(msg.name = "QueryRecommendedModules", %msg.reference_id);
        self.recommended_modules(&msg.reference_id)
    }
}

// query timetable

#[derive(Message)]
#[reply(Arc<TimetableGrid>)]
pub struct QueryTimetable;

#[async_trait]
impl Handler<QueryTimetable> for ProgramStore {
    async fn handle(&mut self, _msg: QueryTimetable, _ctx: &mut Context<Self>) -> Arc<TimetableGrid> {
        tracing::debug!(msg.name = "QueryTimetable");
        self.timetable()
    }
}

// query contiguous successor

/// Looks for the program which starts exactly when another program on the
/// same channel ends.
#[derive(Message)]
#[reply(Option<Program>)]
pub struct QueryContiguousSuccessor {
    pub channel_id: ChannelId,
    pub end_at: DateTime<Jst>,
}

#[async_trait]
impl Handler<QueryContiguousSuccessor> for ProgramStore {
    async fn handle(
        &mut self,
        msg: QueryContiguousSuccessor,
        _ctx: &mut Context<Self>,
    ) -> Option<Program> {
        tracing::debug!(msg.name = "QueryContiguousSuccessor", %msg.channel_id, %msg.end_at);
        self.contiguous_successor(&msg.channel_id, &msg.end_at)
            .cloned()
    }
}

// register emitter

#[derive(Message)]
#[reply(usize)]
pub struct RegisterEmitter(pub Emitter<TimetableUpdated>);

#[async_trait]
impl Handler<RegisterEmitter> for ProgramStore {
    async fn handle(&mut self, msg: RegisterEmitter, _ctx: &mut Context<Self>) -> usize {
        tracing::debug!(msg.name = "RegisterEmitter");
        self.emitters.register(msg.0)
    }
}

// unregister emitter

#[derive(Message)]
pub struct UnregisterEmitter(pub usize);

#[async_trait]
impl Handler<UnregisterEmitter> for ProgramStore {
    async fn handle(&mut self, msg: UnregisterEmitter, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "UnregisterEmitter", id = msg.0);
        self.emitters.unregister(msg.0);
    }
}

// notifications

#[derive(Clone, Debug, Message)]
pub struct TimetableUpdated {
    pub revision: u64,
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::channel_emitter;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn module(id: &str, reference_id: &str) -> RecommendedModule {
        RecommendedModule {
            id: id.into(),
            order: 1,
            title: id.to_string(),
            module_type: "carousel".to_string(),
            reference_id: reference_id.to_string(),
            items: vec![],
        }
    }

    #[test]
    fn test_upsert() {
        let mut store = ProgramStore::new();
        assert_eq!(store.revision, 0);

        let changed = store.upsert(Entities {
            channels: vec![channel!("ch1"), channel!("ch2")],
            programs: vec![program!("p1", "ch1", 0, 10), program!("p2", "ch2", 0, 10)],
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(store.revision, 1);

        // Same values.
        let changed = store.upsert(Entities::with_programs(vec![program!("p1", "ch1", 0, 10)]));
        assert!(!changed);
        assert_eq!(store.revision, 1);

        // Whole-entity replacement keeps the position.
        let mut program = program!("p1", "ch1", 0, 10);
        program.title = "updated".to_string();
        let changed = store.upsert(Entities::with_programs(vec![
            program!("p0", "ch1", 10, 20),
            program,
        ]));
        assert!(changed);
        assert_eq!(store.revision, 2);
        assert_eq!(
            store.programs.keys().map(ProgramId::as_str).collect::<Vec<_>>(),
            vec!["p1", "p2", "p0"]
        );
        assert_eq!(store.programs[&ProgramId::from("p1")].title, "updated");

        // Entities other than channels and programs don't change the grid.
        let changed = store.upsert(Entities {
            modules: vec![module("m1", "p1")],
            ..Default::default()
        });
        assert!(!changed);
        assert_eq!(store.revision, 2);
    }

    #[test]
    fn test_timetable_memoized() {
        let mut store = ProgramStore::new();
        store.upsert(Entities {
            channels: vec![channel!("ch1")],
            programs: vec![program!("b", "ch1", 10, 20), program!("a", "ch1", 0, 10)],
            ..Default::default()
        });

        let grid = store.timetable();
        assert!(Arc::ptr_eq(&grid, &store.timetable()));
        assert_eq!(
            grid[&ChannelId::from("ch1")]
                .programs
                .iter()
                .map(|program| program.id.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        store.upsert(Entities::with_programs(vec![program!("c", "ch1", 20, 30)]));
        let updated = store.timetable();
        assert!(!Arc::ptr_eq(&grid, &updated));
        assert_eq!(updated[&ChannelId::from("ch1")].programs.len(), 3);
    }

    #[test]
    fn test_contiguous_successor() {
        let mut store = ProgramStore::new();
        store.upsert(Entities::with_programs(vec![
            program!("a", "ch1", 0, 100),
            program!("other-channel", "ch2", 100, 200),
            program!("b", "ch1", 100, 200),
            program!("b-dup", "ch1", 100, 150),
            program!("gap", "ch1", 201, 300),
        ]));

        let end_at = chrono_jst::Jst::from_unixtime_ms(100).unwrap();
        assert_matches!(store.contiguous_successor(&"ch1".into(), &end_at), Some(program) => {
            assert_eq!(program.id, ProgramId::from("b"));
        });

        let end_at = chrono_jst::Jst::from_unixtime_ms(200).unwrap();
        assert_matches!(store.contiguous_successor(&"ch1".into(), &end_at), None);
    }

    #[test]
    fn test_recommended_modules() {
        let mut store = ProgramStore::new();
        store.upsert(Entities {
            modules: vec![module("m1", "p1"), module("m2", "p1"), module("m3", "e1")],
            ..Default::default()
        });
        assert_eq!(
            store
                .recommended_modules("p1")
                .iter()
                .map(|module| module.id.as_str())
                .collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
        assert_eq!(store.recommended_modules("e1").len(), 1);
        assert!(store.recommended_modules("unknown").is_empty());

        // Replaced by the latest response for the reference.
        store.upsert(Entities {
            modules: vec![module("m2", "p1")],
            ..Default::default()
        });
        assert_eq!(store.recommended_modules("p1").len(), 1);
    }

    #[test(tokio::test)]
    async fn test_store() {
        let system = System::new();
        let store = system.spawn_actor(ProgramStore::new()).await;

        let (emitter, mut updates) = channel_emitter();
        let id = store.call(RegisterEmitter(emitter)).await.unwrap();

        store
            .call(UpsertEntities(Entities {
                channels: vec![channel!("ch1")],
                programs: vec![program!("p1", "ch1", 0, 10)],
                episodes: vec![],
                series: vec![],
                modules: vec![module("m1", "p1")],
            }))
            .await
            .unwrap();
        assert_matches!(updates.try_recv(), Ok(TimetableUpdated { revision: 1 }));

        // No change, no notification.
        store
            .call(UpsertEntities(Entities::with_channels(vec![channel!("ch1")])))
            .await
            .unwrap();
        assert!(updates.try_recv().is_err());

        assert_matches!(store.call(QueryChannel { channel_id: "ch1".into() }).await, Ok(Some(_)));
        assert_matches!(store.call(QueryChannel { channel_id: "ch2".into() }).await, Ok(None));
        assert_matches!(store.call(QueryChannels).await, Ok(channels) => {
            assert_eq!(channels.len(), 1);
        });
        assert_matches!(store.call(QueryProgram { program_id: "p1".into() }).await, Ok(Some(_)));
        assert_matches!(store.call(QueryPrograms).await, Ok(programs) => {
            assert_eq!(programs.len(), 1);
        });
        assert_matches!(store.call(QueryEpisode { episode_id: "e1".into() }).await, Ok(None));
        assert_matches!(store.call(QuerySeries { series_id: "s1".into() }).await, Ok(None));
        assert_matches!(
            store.call(QueryRecommendedModules { reference_id: "p1".to_string() }).await,
            Ok(modules) => {
                assert_eq!(modules.len(), 1);
            }
        );
        assert_matches!(store.call(QueryTimetable).await, Ok(grid) => {
            assert_eq!(grid.len(), 1);
        });
        assert_matches!(
            store.call(QueryContiguousSuccessor {
                channel_id: "ch1".into(),
                end_at: chrono_jst::Jst::from_unixtime_ms(0).unwrap(),
            }).await,
            Ok(Some(program)) => {
                assert_eq!(program.id, ProgramId::from("p1"));
            }
        );

        store.emit(UnregisterEmitter(id)).await;
        store
            .call(UpsertEntities(Entities::with_channels(vec![channel!("ch2")])))
            .await
            .unwrap();
        assert!(updates.try_recv().is_err());

        system.shutdown().await;
    }
}

// </coverage:exclude>
