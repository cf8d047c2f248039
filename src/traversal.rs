//! Breadth-first expansion over the endpoint dependency graph.
//!
//! Scheduled events seed the queue; lineups discovered while processing an event
//! push per-player work, and event details may push tournament work. Caps and
//! feature toggles are applied when items are pushed, so the resulting order can
//! be inspected without touching the network.

use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkItem {
    EventDetails { event_id: i64 },
    Lineups { event_id: i64 },
    TeamStatistics { event_id: i64 },
    Heatmap { event_id: i64, player_id: i64 },
    Transfers { player_id: i64 },
    PlayerStatistics { event_id: i64, player_id: i64 },
    Tournament { tournament_id: i64, season_id: Option<i64> },
}

/// Identifiers carried by a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRef {
    pub id: i64,
    pub tournament_id: Option<i64>,
    pub season_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerFetches {
    pub heatmap: bool,
    pub transfers: bool,
    pub statistics: bool,
}

impl PlayerFetches {
    fn any(&self) -> bool {
        self.heatmap || self.transfers || self.statistics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalPlan {
    pub max_events: usize,
    /// Per lineup side for the bootstrapper, per event for the snapshotter.
    pub max_players: usize,
    pub max_tournaments: usize,
    pub team_statistics: bool,
    /// Queue tournament work for the seeded events' tournaments.
    pub seed_tournaments: bool,
    pub tournaments: bool,
    pub players: PlayerFetches,
}

#[derive(Debug)]
pub struct Worklist {
    plan: TraversalPlan,
    queue: VecDeque<WorkItem>,
    seen: HashSet<WorkItem>,
    tournaments_queued: usize,
}

impl Worklist {
    pub fn new(plan: TraversalPlan) -> Self {
        Self {
            plan,
            queue: VecDeque::new(),
            seen: HashSet::new(),
            tournaments_queued: 0,
        }
    }

    /// Queues the first `max_events` events, in the order given.
    pub fn seed_events(&mut self, events: &[EventRef]) -> Vec<i64> {
        let retained = events
            .iter()
            .take(self.plan.max_events)
            .copied()
            .collect::<Vec<_>>();
        for event in &retained {
            self.push(WorkItem::EventDetails { event_id: event.id });
            self.push(WorkItem::Lineups { event_id: event.id });
            if self.plan.team_statistics {
                self.push(WorkItem::TeamStatistics { event_id: event.id });
            }
        }
        if self.plan.seed_tournaments {
            for event in &retained {
                if let Some(tournament_id) = event.tournament_id {
                    self.push_tournament(tournament_id, event.season_id);
                }
            }
        }
        retained.iter().map(|e| e.id).collect()
    }

    /// Queues player work for up to `max_players` ids of each side.
    pub fn expand_sides(&mut self, event_id: i64, sides: &[Vec<i64>]) {
        let cap = self.plan.max_players;
        for ids in sides {
            for player_id in ids.iter().take(cap) {
                self.push_player(event_id, *player_id);
            }
        }
    }

    /// Queues player work for up to `max_players` distinct ids overall.
    pub fn expand_players(&mut self, event_id: i64, player_ids: &[i64]) -> Vec<i64> {
        let mut seen = HashSet::new();
        let picked = player_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .take(self.plan.max_players)
            .collect::<Vec<_>>();
        for player_id in &picked {
            self.push_player(event_id, *player_id);
        }
        picked
    }

    pub fn push_tournament(&mut self, tournament_id: i64, season_id: Option<i64>) -> bool {
        if !self.plan.tournaments || self.tournaments_queued >= self.plan.max_tournaments {
            return false;
        }
        let pushed = self.push(WorkItem::Tournament {
            tournament_id,
            season_id,
        });
        if pushed {
            self.tournaments_queued += 1;
        }
        pushed
    }

    fn push_player(&mut self, event_id: i64, player_id: i64) {
        let fetches = self.plan.players;
        if !fetches.any() {
            return;
        }
        if fetches.heatmap {
            self.push(WorkItem::Heatmap {
                event_id,
                player_id,
            });
        }
        if fetches.transfers {
            self.push(WorkItem::Transfers { player_id });
        }
        if fetches.statistics {
            self.push(WorkItem::PlayerStatistics {
                event_id,
                player_id,
            });
        }
    }

    /// Returns false for items already queued or processed in this run.
    pub fn push(&mut self, item: WorkItem) -> bool {
        if !self.seen.insert(item) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
