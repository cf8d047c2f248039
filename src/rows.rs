//! Pure mappings from raw API objects to typed column tuples.
//!
//! Nothing here touches the database; missing or malformed nested objects map to
//! `None` columns instead of errors.

use serde_json::{Map, Value, json};

use crate::json::{
    array, at, bool_at, f64_at, i64_at, obj, object_or_empty, str_at, text_at,
};

pub const FOOTBALL_SPORT_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    pub fn parse(raw: &str) -> Option<Side> {
        match raw {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            _ => None,
        }
    }

    fn lineup_key(self) -> &'static str {
        match self {
            Side::Home => "home_team",
            Side::Away => "away_team",
        }
    }

    fn team_key(self) -> &'static str {
        match self {
            Side::Home => "homeTeam",
            Side::Away => "awayTeam",
        }
    }

    fn score_key(self) -> &'static str {
        match self {
            Side::Home => "homeScore",
            Side::Away => "awayScore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Starter,
    Sub,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Starter => "starter",
            Role::Sub => "sub",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
}

impl SportRow {
    pub fn football() -> Self {
        Self {
            id: FOOTBALL_SPORT_ID,
            name: "Football".to_string(),
            slug: Some("football".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryRow {
    pub alpha2: String,
    pub alpha3: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub sport_id: i64,
    pub flag: Option<String>,
    pub alpha2: Option<String>,
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueTournamentRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub category_id: Option<i64>,
    pub user_count: Option<i64>,
    pub flags: Value,
    pub colors: Value,
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub unique_tournament_id: Option<i64>,
    pub category_id: Option<i64>,
    pub priority: Option<i64>,
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRow {
    pub id: i64,
    pub tournament_id: Option<i64>,
    pub name: Option<String>,
    pub year: Option<String>,
    pub editor: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub short_name: Option<String>,
    pub country_alpha2: Option<String>,
    pub national: Option<bool>,
    pub disabled: Option<bool>,
    pub team_type: Option<i64>,
    pub foundation_ts: Option<i64>,
    pub colors: Value,
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub short_name: Option<String>,
    pub position: Option<String>,
    pub jersey_number: Option<String>,
    pub height: Option<i64>,
    pub date_of_birth_ts: Option<i64>,
    pub country_alpha2: Option<String>,
    pub market_value_eur: Option<i64>,
    pub extra: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueRow {
    pub id: i64,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub city: Option<String>,
    pub capacity: Option<i64>,
    pub country_alpha2: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefereeRow {
    pub id: i64,
    pub name: Option<String>,
    pub country_alpha2: Option<String>,
    pub stats: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: i64,
    pub slug: Option<String>,
    pub tournament_id: Option<i64>,
    pub season_id: Option<i64>,
    pub round: Option<i64>,
    pub round_name: Option<String>,
    pub status_code: Option<i64>,
    pub status_desc: Option<String>,
    pub status_type: Option<String>,
    pub winner_code: Option<i64>,
    pub start_ts: Option<i64>,
    pub final_result_only: Option<bool>,
    pub venue_id: Option<i64>,
    pub referee_id: Option<i64>,
    pub has_player_stats: Option<bool>,
    pub has_player_heatmap: Option<bool>,
    pub extra: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventTeamRow {
    pub event_id: i64,
    pub team_id: i64,
    pub side: Side,
}

/// Per-side score columns; `home`/`away` pairs follow the table layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventScoreRow {
    pub event_id: i64,
    pub home_current: Option<i64>,
    pub away_current: Option<i64>,
    pub home_display: Option<i64>,
    pub away_display: Option<i64>,
    pub home_p1: Option<i64>,
    pub away_p1: Option<i64>,
    pub home_p2: Option<i64>,
    pub away_p2: Option<i64>,
    pub home_normaltime: Option<i64>,
    pub away_normaltime: Option<i64>,
    pub home_pen: Option<i64>,
    pub away_pen: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupRow {
    pub event_id: i64,
    pub team_id: i64,
    pub formation: Option<String>,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupPlayerRow {
    pub event_id: i64,
    pub team_id: i64,
    pub player_id: i64,
    pub position: Option<String>,
    pub shirt_number: Option<i64>,
    pub role: Role,
    pub country_alpha2: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapPoint {
    pub seq: i64,
    pub x: Option<i64>,
    pub y: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRow {
    pub id: i64,
    pub player_id: i64,
    pub from_team_id: Option<i64>,
    pub to_team_id: Option<i64>,
    pub transfer_fee_eur: Option<i64>,
    pub transfer_fee_desc: Option<String>,
    pub transfer_ts: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatisticRow {
    pub event_id: i64,
    pub player_id: i64,
    pub rating: Option<f64>,
    pub stats: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamStatisticRow {
    pub event_id: i64,
    pub team_id: i64,
    pub side: Side,
    pub stats: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandingRow {
    pub tournament_id: i64,
    pub season_id: i64,
    pub group_name: String,
    pub team_id: i64,
    pub rank: Option<i64>,
    pub played: Option<i64>,
    pub wins: Option<i64>,
    pub draws: Option<i64>,
    pub losses: Option<i64>,
    pub gf: Option<i64>,
    pub ga: Option<i64>,
    pub gd: Option<i64>,
    pub points: Option<i64>,
    pub extra: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRow {
    pub tournament_id: i64,
    pub season_id: i64,
    pub video_id: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendingPlayerRow {
    pub player_id: i64,
    pub event_id: i64,
    pub rating: Option<f64>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRow {
    pub entity_type: &'static str,
    pub entity_id: String,
    pub score: Option<i64>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveCategoryCountRow {
    pub category_id: i64,
    pub live_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventCountBySportRow {
    pub sport_slug: String,
    pub live: Option<i64>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwner {
    Player,
    Team,
    Tournament,
}

impl ImageOwner {
    pub fn path(self, id: i64) -> String {
        match self {
            ImageOwner::Player => format!("/player/{id}/image"),
            ImageOwner::Team => format!("/team/{id}/image"),
            ImageOwner::Tournament => format!("/tournament/{id}/image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRow {
    pub owner: ImageOwner,
    pub owner_id: i64,
    pub url: Option<String>,
    /// Player image kind or team image size (`full`/`small`).
    pub kind: Option<String>,
}

pub fn map_sport(v: &Value) -> Option<SportRow> {
    let id = i64_at(v, "id")?;
    Some(SportRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
    })
}

pub fn map_country(v: &Value) -> Option<CountryRow> {
    let alpha2 = str_at(v, "alpha2").filter(|s| !s.trim().is_empty())?;
    Some(CountryRow {
        alpha2,
        alpha3: str_at(v, "alpha3"),
        name: str_at(v, "name"),
        slug: str_at(v, "slug"),
    })
}

pub fn map_category(v: &Value) -> Option<CategoryRow> {
    let id = i64_at(v, "id")?;
    Some(CategoryRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
        sport_id: i64_at(obj(v, "sport"), "id").unwrap_or(FOOTBALL_SPORT_ID),
        flag: str_at(v, "flag"),
        alpha2: str_at(v, "alpha2"),
        translations: object_or_empty(v.get("fieldTranslations")),
    })
}

pub fn map_unique_tournament(v: &Value) -> Option<UniqueTournamentRow> {
    let id = i64_at(v, "id")?;
    Some(UniqueTournamentRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
        category_id: i64_at(obj(v, "category"), "id"),
        user_count: i64_at(v, "userCount"),
        flags: json!({
            "hasPerformanceGraphFeature": v.get("hasPerformanceGraphFeature"),
            "hasEventPlayerStatistics": v.get("hasEventPlayerStatistics"),
            "displayInverseHomeAwayTeams": v.get("displayInverseHomeAwayTeams"),
        }),
        colors: json!({
            "primary": v.get("primaryColorHex"),
            "secondary": v.get("secondaryColorHex"),
        }),
        translations: object_or_empty(v.get("fieldTranslations")),
    })
}

pub fn map_tournament(v: &Value) -> Option<TournamentRow> {
    let id = i64_at(v, "id")?;
    Some(TournamentRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
        unique_tournament_id: i64_at(obj(v, "uniqueTournament"), "id"),
        category_id: i64_at(obj(v, "category"), "id"),
        priority: i64_at(v, "priority"),
        translations: object_or_empty(v.get("fieldTranslations")),
    })
}

pub fn map_season(v: &Value, tournament_id: Option<i64>) -> Option<SeasonRow> {
    let id = i64_at(v, "id")?;
    Some(SeasonRow {
        id,
        tournament_id,
        name: str_at(v, "name"),
        year: text_at(v, "year"),
        editor: bool_at(v, "editor"),
    })
}

pub fn map_team(v: &Value) -> Option<TeamRow> {
    let id = i64_at(v, "id")?;
    Some(TeamRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
        short_name: str_at(v, "shortName"),
        country_alpha2: map_country(obj(v, "country")).map(|c| c.alpha2),
        national: bool_at(v, "national"),
        disabled: bool_at(v, "disabled"),
        team_type: i64_at(v, "type"),
        foundation_ts: i64_at(v, "foundationDateTimestamp"),
        colors: object_or_empty(v.get("teamColors")),
        translations: object_or_empty(v.get("fieldTranslations")),
    })
}

/// Full player object (trending, search).
pub fn map_player(v: &Value, source: &str) -> Option<PlayerRow> {
    let id = i64_at(v, "id")?;
    let market_value = i64_at(obj(v, "proposedMarketValueRaw"), "value")
        .or_else(|| i64_at(obj(v, "marketValue"), "value"));
    Some(PlayerRow {
        id,
        name: str_at(v, "name").unwrap_or_default(),
        slug: str_at(v, "slug"),
        short_name: str_at(v, "shortName"),
        position: str_at(v, "position"),
        jersey_number: text_at(v, "jerseyNumber"),
        height: i64_at(v, "height"),
        date_of_birth_ts: i64_at(v, "dateOfBirthTimestamp"),
        country_alpha2: map_country(obj(v, "country")).map(|c| c.alpha2),
        market_value_eur: market_value,
        extra: json!({ "source": source }),
    })
}

pub fn map_venue(v: &Value) -> Option<VenueRow> {
    let id = i64_at(v, "id")?;
    let coords = obj(v, "venueCoordinates");
    Some(VenueRow {
        id,
        name: str_at(v, "name"),
        slug: str_at(v, "slug"),
        city: str_at(obj(v, "city"), "name"),
        capacity: i64_at(obj(v, "stadium"), "capacity"),
        country_alpha2: map_country(obj(v, "country")).map(|c| c.alpha2),
        lat: f64_at(coords, "latitude"),
        lon: f64_at(coords, "longitude"),
        translations: object_or_empty(v.get("fieldTranslations")),
    })
}

pub fn map_referee(v: &Value) -> Option<RefereeRow> {
    let id = i64_at(v, "id")?;
    Some(RefereeRow {
        id,
        name: str_at(v, "name"),
        country_alpha2: map_country(obj(v, "country")).map(|c| c.alpha2),
        stats: json!({
            "yellowCards": v.get("yellowCards"),
            "redCards": v.get("redCards"),
            "yellowRedCards": v.get("yellowRedCards"),
            "games": v.get("games"),
        }),
    })
}

/// Event core row. Venue and referee ids are passed in because they may only
/// be referenced once their rows exist.
pub fn map_event(e: &Value, venue_id: Option<i64>, referee_id: Option<i64>) -> Option<EventRow> {
    let id = i64_at(e, "id")?;
    let tournament = obj(e, "tournament");
    let status = obj(e, "status");
    let round = obj(e, "roundInfo");
    Some(EventRow {
        id,
        slug: str_at(e, "slug"),
        tournament_id: i64_at(tournament, "id"),
        season_id: i64_at(obj(e, "season"), "id"),
        round: i64_at(round, "round"),
        round_name: str_at(round, "name"),
        status_code: i64_at(status, "code"),
        status_desc: str_at(status, "description"),
        status_type: str_at(status, "type"),
        winner_code: i64_at(e, "winnerCode"),
        start_ts: i64_at(e, "startTimestamp"),
        final_result_only: bool_at(e, "finalResultOnly"),
        venue_id,
        referee_id,
        has_player_stats: bool_at(e, "hasEventPlayerStatistics"),
        has_player_heatmap: bool_at(e, "hasEventPlayerHeatMap"),
        extra: json!({
            "priority": tournament.get("priority"),
            "detailId": e.get("detailId"),
            "defaultPeriodCount": e.get("defaultPeriodCount"),
            "defaultPeriodLength": e.get("defaultPeriodLength"),
        }),
    })
}

pub fn map_event_teams(e: &Value) -> Vec<EventTeamRow> {
    let Some(event_id) = i64_at(e, "id") else {
        return Vec::new();
    };
    Side::BOTH
        .iter()
        .filter_map(|side| {
            let team_id = i64_at(obj(e, side.team_key()), "id")?;
            Some(EventTeamRow {
                event_id,
                team_id,
                side: *side,
            })
        })
        .collect()
}

pub fn map_event_score(e: &Value) -> Option<EventScoreRow> {
    let event_id = i64_at(e, "id")?;
    let home = obj(e, Side::Home.score_key());
    let away = obj(e, Side::Away.score_key());
    Some(EventScoreRow {
        event_id,
        home_current: i64_at(home, "current"),
        away_current: i64_at(away, "current"),
        home_display: i64_at(home, "display"),
        away_display: i64_at(away, "display"),
        home_p1: i64_at(home, "period1"),
        away_p1: i64_at(away, "period1"),
        home_p2: i64_at(home, "period2"),
        away_p2: i64_at(away, "period2"),
        home_normaltime: i64_at(home, "normaltime"),
        away_normaltime: i64_at(away, "normaltime"),
        home_pen: i64_at(home, "penalties"),
        away_pen: i64_at(away, "penalties"),
    })
}

/// Home/away team objects embedded in an event.
pub fn event_team_objects(e: &Value) -> impl Iterator<Item = &Value> {
    Side::BOTH
        .into_iter()
        .map(move |side| obj(e, side.team_key()))
        .filter(|t| !t.is_null())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupEntry {
    pub player: PlayerRow,
    pub position: Option<String>,
    pub shirt_number: Option<i64>,
    pub role: Role,
    pub country_alpha2: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupSideBlock {
    pub side: Side,
    pub formation: Option<String>,
    /// Starters first, then substitutes, in API order.
    pub entries: Vec<LineupEntry>,
}

impl LineupSideBlock {
    pub fn starter_ids(&self) -> Vec<i64> {
        self.entries
            .iter()
            .filter(|e| e.role == Role::Starter)
            .map(|e| e.player.id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLineups {
    pub confirmed: bool,
    pub sides: Vec<LineupSideBlock>,
}

pub fn map_lineups(data: &Value) -> ParsedLineups {
    let confirmed = bool_at(data, "confirmed").unwrap_or(false);
    let mut sides = Vec::new();
    for side in Side::BOTH {
        let block = obj(data, side.lineup_key());
        if block.is_null() {
            continue;
        }
        let mut entries = Vec::new();
        for (key, role) in [("starting_eleven", Role::Starter), ("substitutes", Role::Sub)] {
            for p in array(block, key) {
                if let Some(entry) = map_lineup_entry(p, role) {
                    entries.push(entry);
                }
            }
        }
        sides.push(LineupSideBlock {
            side,
            formation: str_at(block, "formation"),
            entries,
        });
    }
    ParsedLineups { confirmed, sides }
}

fn map_lineup_entry(p: &Value, role: Role) -> Option<LineupEntry> {
    let nested = obj(p, "player");
    let id = i64_at(p, "player_id")
        .or_else(|| i64_at(p, "id"))
        .or_else(|| i64_at(nested, "id"))?;
    let name = str_at(p, "name")
        .or_else(|| str_at(nested, "name"))
        .unwrap_or_default();
    let position = str_at(p, "position").or_else(|| str_at(nested, "position"));
    let shirt = text_at(p, "shirt_number").or_else(|| text_at(p, "shirtNumber"));
    let country_alpha2 = map_country(obj(p, "country"))
        .or_else(|| map_country(obj(nested, "country")))
        .map(|c| c.alpha2);
    Some(LineupEntry {
        player: PlayerRow {
            id,
            name,
            slug: str_at(nested, "slug"),
            short_name: str_at(nested, "shortName"),
            position: position.clone(),
            jersey_number: shirt.clone(),
            height: None,
            date_of_birth_ts: None,
            country_alpha2: country_alpha2.clone(),
            market_value_eur: None,
            extra: json!({ "source": "lineup" }),
        },
        position,
        shirt_number: shirt.and_then(|s| s.trim().parse::<i64>().ok()),
        role,
        country_alpha2,
    })
}

/// Points keep their input order as `seq`.
pub fn map_heatmap(data: &Value) -> Vec<HeatmapPoint> {
    array(data, "heatmap")
        .iter()
        .enumerate()
        .map(|(idx, pt)| HeatmapPoint {
            seq: idx as i64,
            x: f64_at(pt, "x").map(|f| f.round() as i64),
            y: f64_at(pt, "y").map(|f| f.round() as i64),
        })
        .collect()
}

/// A transfer plus the team objects it references.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEntry<'a> {
    pub row: TransferRow,
    pub from_team: &'a Value,
    pub to_team: &'a Value,
}

pub fn map_transfers(data: &Value, player_id: i64) -> Vec<TransferEntry<'_>> {
    array(data, "transferHistory")
        .iter()
        .filter_map(|tr| {
            let id = i64_at(tr, "id")?;
            let from_team = obj(tr, "transferFrom");
            let to_team = obj(tr, "transferTo");
            Some(TransferEntry {
                row: TransferRow {
                    id,
                    player_id: i64_at(obj(tr, "player"), "id").unwrap_or(player_id),
                    from_team_id: i64_at(from_team, "id"),
                    to_team_id: i64_at(to_team, "id"),
                    transfer_fee_eur: i64_at(obj(tr, "transferFeeRaw"), "value"),
                    transfer_fee_desc: str_at(tr, "transferFeeDescription"),
                    transfer_ts: i64_at(tr, "transferDateTimestamp"),
                },
                from_team,
                to_team,
            })
        })
        .collect()
}

pub fn map_player_statistics(
    data: &Value,
    event_id: i64,
    player_id: i64,
) -> Option<PlayerStatisticRow> {
    let stats = data.get("statistics")?.as_object()?;
    if stats.is_empty() {
        return None;
    }
    let stats = Value::Object(stats.clone());
    Some(PlayerStatisticRow {
        event_id,
        player_id,
        rating: f64_at(&stats, "rating"),
        stats,
    })
}

/// Grouped statistic items split into one `{group: {item: value}}` object per side.
pub fn map_team_statistics(data: &Value) -> [(Side, Value); 2] {
    let mut home = Map::new();
    let mut away = Map::new();
    for group in stat_groups(data) {
        let group_name = str_at(group, "groupName").unwrap_or_else(|| "ungrouped".to_string());
        for item in array(group, "statisticsItems") {
            let Some(name) = str_at(item, "name") else {
                continue;
            };
            for (target, key) in [(&mut home, "homeValue"), (&mut away, "awayValue")] {
                let value = item.get(key).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    continue;
                }
                let entry = target
                    .entry(group_name.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Some(map) = entry.as_object_mut() {
                    map.insert(name.clone(), value);
                }
            }
        }
    }
    [
        (Side::Home, Value::Object(home)),
        (Side::Away, Value::Object(away)),
    ]
}

/// Accepts either a flat list of groups or period blocks with nested `groups`,
/// keeping only the whole-match (`ALL`) period when one is present.
fn stat_groups(data: &Value) -> Vec<&Value> {
    let top = array(data, "statistics");
    let has_periods = top.iter().any(|el| el.get("groups").is_some());
    if !has_periods {
        return top.iter().collect();
    }
    let has_all = top
        .iter()
        .any(|el| el.get("period").and_then(Value::as_str) == Some("ALL"));
    top.iter()
        .filter(|el| {
            !has_all || el.get("period").and_then(Value::as_str) == Some("ALL")
        })
        .flat_map(|el| array(el, "groups").iter())
        .collect()
}

/// A standing row plus the team object it references.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingEntry<'a> {
    pub row: StandingRow,
    pub team: &'a Value,
}

pub fn map_standings(data: &Value, tournament_id: i64, season_id: i64) -> Vec<StandingEntry<'_>> {
    let mut out = Vec::new();
    for group in array(data, "standings") {
        let group_name = str_at(group, "name").unwrap_or_default();
        for row in array(group, "rows") {
            let team = obj(row, "team");
            let Some(team_id) = i64_at(team, "id") else {
                continue;
            };
            let gf = i64_at(row, "scoresFor");
            let ga = i64_at(row, "scoresAgainst");
            out.push(StandingEntry {
                row: StandingRow {
                    tournament_id,
                    season_id,
                    group_name: group_name.clone(),
                    team_id,
                    rank: i64_at(row, "position"),
                    played: i64_at(row, "matches"),
                    wins: i64_at(row, "wins"),
                    draws: i64_at(row, "draws"),
                    losses: i64_at(row, "losses"),
                    gf,
                    ga,
                    gd: gf.zip(ga).map(|(f, a)| f - a),
                    points: i64_at(row, "points"),
                    extra: row.clone(),
                },
                team,
            });
        }
    }
    out
}

pub fn map_featured_event_ids(data: &Value) -> Vec<i64> {
    array(data, "events")
        .iter()
        .filter_map(|e| i64_at(e, "id"))
        .collect()
}

pub fn map_videos(data: &Value, tournament_id: i64, season_id: i64) -> Vec<VideoRow> {
    array(data, "videos")
        .iter()
        .filter_map(|v| {
            let video_id = text_at(v, "id")?;
            Some(VideoRow {
                tournament_id,
                season_id,
                video_id,
                payload: v.clone(),
            })
        })
        .collect()
}

pub fn map_trending(data: &Value) -> Vec<(PlayerRow, TrendingPlayerRow)> {
    array(data, "players")
        .iter()
        .filter_map(|entry| {
            let player = map_player(obj(entry, "player"), "trending")?;
            let event_id = i64_at(obj(entry, "event"), "id")
                .or_else(|| i64_at(entry, "eventId"))
                .unwrap_or(0);
            let rating = f64_at(entry, "rating").or_else(|| f64_at(entry, "trendingScore"));
            let row = TrendingPlayerRow {
                player_id: player.id,
                event_id,
                rating,
                payload: entry.clone(),
            };
            Some((player, row))
        })
        .collect()
}

pub fn suggestion_entity_type(raw: &str) -> Option<&'static str> {
    match raw {
        "team" => Some("team"),
        "player" => Some("player"),
        "uniqueTournament" | "unique_tournament" => Some("unique_tournament"),
        "tournament" => Some("tournament"),
        _ => None,
    }
}

pub fn map_suggestions(data: &Value) -> Vec<SuggestionRow> {
    array(data, "suggestions")
        .iter()
        .filter_map(|s| {
            let entity_type = str_at(s, "type").as_deref().and_then(suggestion_entity_type)?;
            let entity_id = text_at(s, "id").or_else(|| text_at(obj(s, "entity"), "id"))?;
            Some(SuggestionRow {
                entity_type,
                entity_id,
                score: i64_at(s, "score").or_else(|| i64_at(s, "priority")),
                payload: s.clone(),
            })
        })
        .collect()
}

pub fn map_live_category_counts(data: &Value) -> Vec<LiveCategoryCountRow> {
    array(data, "categories")
        .iter()
        .filter_map(|c| {
            let category_id = i64_at(c, "id").or_else(|| i64_at(obj(c, "category"), "id"))?;
            Some(LiveCategoryCountRow {
                category_id,
                live_count: i64_at(c, "liveCount").or_else(|| i64_at(c, "live")),
            })
        })
        .collect()
}

/// Handles both `sports: [..]` lists and `{slug: {live, total}}` maps.
pub fn map_event_counts_by_sport(data: &Value) -> Vec<EventCountBySportRow> {
    if let Some(list) = data.get("sports").and_then(Value::as_array) {
        return list
            .iter()
            .filter_map(|s| {
                let slug = str_at(s, "slug")
                    .or_else(|| str_at(s, "name").map(|n| n.to_lowercase()))?;
                Some(EventCountBySportRow {
                    sport_slug: slug,
                    live: i64_at(s, "liveEventCount").or_else(|| i64_at(s, "live")),
                    total: i64_at(s, "eventCount").or_else(|| i64_at(s, "total")),
                })
            })
            .collect();
    }
    let Some(map) = data.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter(|(_, v)| v.is_object())
        .map(|(slug, v)| EventCountBySportRow {
            sport_slug: slug.clone(),
            live: i64_at(v, "live"),
            total: i64_at(v, "total"),
        })
        .collect()
}

pub fn map_image(data: &Value, owner: ImageOwner, owner_id: i64) -> ImageRow {
    let kind = match owner {
        ImageOwner::Player => str_at(data, "type").or_else(|| str_at(data, "kind")),
        ImageOwner::Team => Some(
            match str_at(data, "size").as_deref() {
                Some("small") => "small",
                _ => "full",
            }
            .to_string(),
        ),
        ImageOwner::Tournament => None,
    };
    ImageRow {
        owner,
        owner_id,
        url: str_at(data, "url").or_else(|| at(data, &["image", "url"]).as_str().map(String::from)),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_without_id_is_rejected() {
        assert!(map_event(&json!({"slug": "a-b"}), None, None).is_none());
        assert!(map_event_score(&json!({})).is_none());
        assert!(map_event_teams(&json!({"homeTeam": {"id": 1}})).is_empty());
    }

    #[test]
    fn absent_nested_objects_become_null_columns() {
        let row = map_event(&json!({"id": 9, "status": "weird"}), None, None).unwrap();
        assert_eq!(row.tournament_id, None);
        assert_eq!(row.status_code, None);
        assert_eq!(row.round, None);
    }

    #[test]
    fn heatmap_rounds_fractional_coordinates() {
        let pts = map_heatmap(&json!({"heatmap": [{"x": 1.6, "y": 2}, {"x": null}]}));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0], HeatmapPoint { seq: 0, x: Some(2), y: Some(2) });
        assert_eq!(pts[1], HeatmapPoint { seq: 1, x: None, y: None });
    }

    #[test]
    fn team_statistics_split_by_side() {
        let data = json!({"statistics": [
            {"groupName": "Shots", "statisticsItems": [
                {"name": "Total shots", "homeValue": 12, "awayValue": 7},
                {"name": "Blocked", "homeValue": 2, "awayValue": null}
            ]}
        ]});
        let [(home_side, home), (away_side, away)] = map_team_statistics(&data);
        assert_eq!(home_side, Side::Home);
        assert_eq!(away_side, Side::Away);
        assert_eq!(home, json!({"Shots": {"Total shots": 12, "Blocked": 2}}));
        assert_eq!(away, json!({"Shots": {"Total shots": 7}}));
    }

    #[test]
    fn team_statistics_prefer_all_period() {
        let data = json!({"statistics": [
            {"period": "1ST", "groups": [{"groupName": "G", "statisticsItems": [{"name": "a", "homeValue": 1, "awayValue": 1}]}]},
            {"period": "ALL", "groups": [{"groupName": "G", "statisticsItems": [{"name": "a", "homeValue": 3, "awayValue": 4}]}]}
        ]});
        let [(_, home), (_, away)] = map_team_statistics(&data);
        assert_eq!(home, json!({"G": {"a": 3}}));
        assert_eq!(away, json!({"G": {"a": 4}}));
    }

    #[test]
    fn lineup_entries_keep_role_and_order() {
        let data = json!({
            "confirmed": true,
            "home_team": {
                "formation": "4-3-3",
                "starting_eleven": [{"player_id": 1, "name": "A", "shirt_number": "9"}],
                "substitutes": [{"player_id": 2, "name": "B"}, {"name": "no id"}]
            }
        });
        let parsed = map_lineups(&data);
        assert!(parsed.confirmed);
        assert_eq!(parsed.sides.len(), 1);
        let home = &parsed.sides[0];
        assert_eq!(home.side, Side::Home);
        assert_eq!(home.formation.as_deref(), Some("4-3-3"));
        assert_eq!(home.entries.len(), 2);
        assert_eq!(home.entries[0].shirt_number, Some(9));
        assert_eq!(home.entries[1].role, Role::Sub);
        assert_eq!(home.starter_ids(), vec![1]);
    }

    #[test]
    fn standings_compute_goal_difference() {
        let data = json!({"standings": [{"name": "Group A", "rows": [
            {"team": {"id": 5, "name": "X"}, "position": 1, "matches": 3, "scoresFor": 7, "scoresAgainst": 2, "points": 9},
            {"team": {}, "position": 2}
        ]}]});
        let rows = map_standings(&data, 17, 100);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row.gd, Some(5));
        assert_eq!(rows[0].row.group_name, "Group A");
        assert_eq!(rows[0].row.rank, Some(1));
    }

    #[test]
    fn suggestions_keep_only_known_entity_types() {
        let data = json!({"suggestions": [
            {"type": "uniqueTournament", "id": 17, "score": 90},
            {"type": "manager", "id": 3},
            {"type": "team", "entity": {"id": "44"}}
        ]});
        let rows = map_suggestions(&data);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity_type, "unique_tournament");
        assert_eq!(rows[0].entity_id, "17");
        assert_eq!(rows[1].entity_id, "44");
    }

    #[test]
    fn event_counts_accept_map_shape() {
        let rows = map_event_counts_by_sport(&json!({"football": {"live": 3, "total": 40}}));
        assert_eq!(
            rows,
            vec![EventCountBySportRow {
                sport_slug: "football".to_string(),
                live: Some(3),
                total: Some(40)
            }]
        );
        let rows = map_event_counts_by_sport(&json!({"sports": [
            {"name": "Tennis", "liveEventCount": 1, "eventCount": 8}
        ]}));
        assert_eq!(rows[0].sport_slug, "tennis");
        assert_eq!(rows[0].total, Some(8));
    }

    #[test]
    fn team_image_size_is_normalized() {
        let row = map_image(&json!({"url": "u", "size": "huge"}), ImageOwner::Team, 1);
        assert_eq!(row.kind.as_deref(), Some("full"));
        let row = map_image(&json!({"url": "u", "size": "small"}), ImageOwner::Team, 1);
        assert_eq!(row.kind.as_deref(), Some("small"));
    }
}
