//! One idempotent statement per entity. Conflict targets are the natural keys and
//! every non-key column is overwritten with the incoming value.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::Value;

use crate::json::to_text;
use crate::rows::{
    CategoryRow, CountryRow, EventCountBySportRow, EventRow, EventScoreRow, EventTeamRow,
    HeatmapPoint, ImageOwner, ImageRow, LineupPlayerRow, LineupRow, LiveCategoryCountRow,
    PlayerRow, PlayerStatisticRow, RefereeRow, SeasonRow, SportRow, StandingRow, SuggestionRow,
    TeamRow, TeamStatisticRow, TournamentRow, TransferRow, TrendingPlayerRow,
    UniqueTournamentRow, VenueRow, VideoRow, map_category, map_country, map_sport, map_team,
    map_unique_tournament,
};

const UPSERT_SPORT: &str = "INSERT INTO sports (id, name, slug) VALUES (?1, ?2, ?3)
    ON CONFLICT(id) DO UPDATE SET name = excluded.name, slug = excluded.slug";

const UPSERT_COUNTRY: &str = "INSERT INTO countries (alpha2, alpha3, name, slug)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(alpha2) DO UPDATE SET
        alpha3 = excluded.alpha3, name = excluded.name, slug = excluded.slug";

const UPSERT_CATEGORY: &str = "INSERT INTO categories
        (id, name, slug, sport_id, flag, alpha2, translations)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        sport_id = excluded.sport_id,
        flag = excluded.flag,
        alpha2 = excluded.alpha2,
        translations = excluded.translations";

const UPSERT_UNIQUE_TOURNAMENT: &str = "INSERT INTO unique_tournaments
        (id, name, slug, category_id, user_count, flags, colors, translations)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        category_id = excluded.category_id,
        user_count = excluded.user_count,
        flags = excluded.flags,
        colors = excluded.colors,
        translations = excluded.translations";

const UPSERT_TOURNAMENT: &str = "INSERT INTO tournaments
        (id, name, slug, unique_tournament_id, category_id, priority, translations)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        unique_tournament_id = excluded.unique_tournament_id,
        category_id = excluded.category_id,
        priority = excluded.priority,
        translations = excluded.translations";

const UPSERT_SEASON: &str = "INSERT INTO seasons (id, tournament_id, name, year, editor)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(id) DO UPDATE SET
        tournament_id = excluded.tournament_id,
        name = excluded.name,
        year = excluded.year,
        editor = excluded.editor";

const UPSERT_TEAM: &str = "INSERT INTO teams
        (id, name, slug, short_name, country_alpha2, national, disabled, type,
         foundation_ts, colors, translations)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        short_name = excluded.short_name,
        country_alpha2 = excluded.country_alpha2,
        national = excluded.national,
        disabled = excluded.disabled,
        type = excluded.type,
        foundation_ts = excluded.foundation_ts,
        colors = excluded.colors,
        translations = excluded.translations";

const UPSERT_PLAYER: &str = "INSERT INTO players
        (id, name, slug, short_name, position, jersey_number, height, date_of_birth_ts,
         country_alpha2, market_value_eur, extra)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        short_name = excluded.short_name,
        position = excluded.position,
        jersey_number = excluded.jersey_number,
        height = excluded.height,
        date_of_birth_ts = excluded.date_of_birth_ts,
        country_alpha2 = excluded.country_alpha2,
        market_value_eur = excluded.market_value_eur,
        extra = excluded.extra";

const UPSERT_VENUE: &str = "INSERT INTO venues
        (id, name, slug, city, capacity, country_alpha2, lat, lon, translations)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        slug = excluded.slug,
        city = excluded.city,
        capacity = excluded.capacity,
        country_alpha2 = excluded.country_alpha2,
        lat = excluded.lat,
        lon = excluded.lon,
        translations = excluded.translations";

const UPSERT_REFEREE: &str = "INSERT INTO referees (id, name, country_alpha2, stats)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name, country_alpha2 = excluded.country_alpha2, stats = excluded.stats";

const UPSERT_EVENT: &str = "INSERT INTO events
        (id, slug, tournament_id, season_id, round, round_name, status_code, status_desc,
         status_type, winner_code, start_ts, final_result_only, venue_id, referee_id,
         has_player_stats, has_player_heatmap, extra)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
    ON CONFLICT(id) DO UPDATE SET
        slug = excluded.slug,
        tournament_id = excluded.tournament_id,
        season_id = excluded.season_id,
        round = excluded.round,
        round_name = excluded.round_name,
        status_code = excluded.status_code,
        status_desc = excluded.status_desc,
        status_type = excluded.status_type,
        winner_code = excluded.winner_code,
        start_ts = excluded.start_ts,
        final_result_only = excluded.final_result_only,
        venue_id = excluded.venue_id,
        referee_id = excluded.referee_id,
        has_player_stats = excluded.has_player_stats,
        has_player_heatmap = excluded.has_player_heatmap,
        extra = excluded.extra";

const UPSERT_EVENT_TEAM: &str = "INSERT INTO event_teams (event_id, team_id, side)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(event_id, side) DO UPDATE SET team_id = excluded.team_id";

const UPSERT_EVENT_SCORE: &str = "INSERT INTO event_scores
        (event_id, home_current, away_current, home_display, away_display, home_p1, away_p1,
         home_p2, away_p2, home_normaltime, away_normaltime, home_pen, away_pen)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(event_id) DO UPDATE SET
        home_current = excluded.home_current,
        away_current = excluded.away_current,
        home_display = excluded.home_display,
        away_display = excluded.away_display,
        home_p1 = excluded.home_p1,
        away_p1 = excluded.away_p1,
        home_p2 = excluded.home_p2,
        away_p2 = excluded.away_p2,
        home_normaltime = excluded.home_normaltime,
        away_normaltime = excluded.away_normaltime,
        home_pen = excluded.home_pen,
        away_pen = excluded.away_pen";

const UPSERT_LINEUP: &str = "INSERT INTO lineups (event_id, team_id, formation, confirmed)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(event_id, team_id) DO UPDATE SET
        formation = excluded.formation, confirmed = excluded.confirmed";

const UPSERT_LINEUP_PLAYER: &str = "INSERT INTO lineup_players
        (event_id, team_id, player_id, position, shirt_number, role, country_alpha2)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(event_id, team_id, player_id, role) DO UPDATE SET
        position = excluded.position,
        shirt_number = excluded.shirt_number,
        country_alpha2 = excluded.country_alpha2";

const UPSERT_HEATMAP_POINT: &str = "INSERT INTO player_heatmaps (event_id, player_id, seq, x, y)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(event_id, player_id, seq) DO NOTHING";

const UPSERT_TRANSFER: &str = "INSERT INTO player_transfers
        (id, player_id, from_team_id, to_team_id, transfer_fee_eur, transfer_fee_desc,
         transfer_ts)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        player_id = excluded.player_id,
        from_team_id = excluded.from_team_id,
        to_team_id = excluded.to_team_id,
        transfer_fee_eur = excluded.transfer_fee_eur,
        transfer_fee_desc = excluded.transfer_fee_desc,
        transfer_ts = excluded.transfer_ts";

const UPSERT_PLAYER_STATISTICS: &str = "INSERT INTO player_statistics
        (event_id, player_id, rating, stats)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(event_id, player_id) DO UPDATE SET
        rating = excluded.rating, stats = excluded.stats";

const UPSERT_TEAM_STATISTICS: &str = "INSERT INTO team_statistics
        (event_id, team_id, side, stats)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(event_id, team_id) DO UPDATE SET
        side = excluded.side, stats = excluded.stats";

const UPSERT_STANDING: &str = "INSERT INTO standings
        (tournament_id, season_id, group_name, team_id, rank, played, wins, draws, losses,
         gf, ga, gd, points, extra)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    ON CONFLICT(tournament_id, season_id, group_name, team_id) DO UPDATE SET
        rank = excluded.rank,
        played = excluded.played,
        wins = excluded.wins,
        draws = excluded.draws,
        losses = excluded.losses,
        gf = excluded.gf,
        ga = excluded.ga,
        gd = excluded.gd,
        points = excluded.points,
        extra = excluded.extra";

const UPSERT_FEATURED_EVENT: &str = "INSERT INTO tournament_featured_events
        (tournament_id, event_id)
    VALUES (?1, ?2)
    ON CONFLICT(tournament_id, event_id) DO NOTHING";

const UPSERT_VIDEO: &str = "INSERT INTO tournament_videos
        (tournament_id, season_id, video_id, payload)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(tournament_id, season_id, video_id) DO UPDATE SET payload = excluded.payload";

const UPSERT_TRENDING_PLAYER: &str = "INSERT INTO trending_players
        (player_id, event_id, rating, payload)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(player_id, event_id) DO UPDATE SET
        rating = excluded.rating, payload = excluded.payload";

const UPSERT_SUGGESTION: &str = "INSERT INTO suggestions
        (entity_type, entity_id, score, payload)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(entity_type, entity_id) DO UPDATE SET
        score = excluded.score, payload = excluded.payload";

const UPSERT_LIVE_CATEGORY_COUNT: &str = "INSERT INTO live_category_counts
        (category_id, live_count)
    VALUES (?1, ?2)
    ON CONFLICT(category_id) DO UPDATE SET live_count = excluded.live_count";

const UPSERT_EVENT_COUNT_BY_SPORT: &str = "INSERT INTO event_count_by_sport
        (sport_slug, live, total)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(sport_slug) DO UPDATE SET live = excluded.live, total = excluded.total";

const UPSERT_PLAYER_IMAGE: &str = "INSERT INTO images_player (player_id, url, kind, fetched_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(player_id) DO UPDATE SET
        url = excluded.url, kind = excluded.kind, fetched_at = excluded.fetched_at";

const UPSERT_TEAM_IMAGE: &str = "INSERT INTO images_team (team_id, size, url, fetched_at)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(team_id, size) DO UPDATE SET
        url = excluded.url, fetched_at = excluded.fetched_at";

const UPSERT_TOURNAMENT_IMAGE: &str = "INSERT INTO images_tournament (tournament_id, url, fetched_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(tournament_id) DO UPDATE SET
        url = excluded.url, fetched_at = excluded.fetched_at";

pub fn upsert_sport(conn: &Connection, r: &SportRow) -> Result<()> {
    conn.execute(UPSERT_SPORT, params![r.id, r.name, r.slug])
        .context("upsert sport")?;
    Ok(())
}

pub fn upsert_country(conn: &Connection, r: &CountryRow) -> Result<()> {
    conn.execute(UPSERT_COUNTRY, params![r.alpha2, r.alpha3, r.name, r.slug])
        .context("upsert country")?;
    Ok(())
}

pub fn upsert_category(conn: &Connection, r: &CategoryRow) -> Result<()> {
    conn.execute(
        UPSERT_CATEGORY,
        params![
            r.id,
            r.name,
            r.slug,
            r.sport_id,
            r.flag,
            r.alpha2,
            to_text(&r.translations)
        ],
    )
    .with_context(|| format!("upsert category {}", r.id))?;
    Ok(())
}

pub fn upsert_unique_tournament(conn: &Connection, r: &UniqueTournamentRow) -> Result<()> {
    conn.execute(
        UPSERT_UNIQUE_TOURNAMENT,
        params![
            r.id,
            r.name,
            r.slug,
            r.category_id,
            r.user_count,
            to_text(&r.flags),
            to_text(&r.colors),
            to_text(&r.translations)
        ],
    )
    .with_context(|| format!("upsert unique tournament {}", r.id))?;
    Ok(())
}

pub fn upsert_tournament(conn: &Connection, r: &TournamentRow) -> Result<()> {
    conn.execute(
        UPSERT_TOURNAMENT,
        params![
            r.id,
            r.name,
            r.slug,
            r.unique_tournament_id,
            r.category_id,
            r.priority,
            to_text(&r.translations)
        ],
    )
    .with_context(|| format!("upsert tournament {}", r.id))?;
    Ok(())
}

pub fn upsert_season(conn: &Connection, r: &SeasonRow) -> Result<()> {
    conn.execute(
        UPSERT_SEASON,
        params![r.id, r.tournament_id, r.name, r.year, r.editor],
    )
    .with_context(|| format!("upsert season {}", r.id))?;
    Ok(())
}

pub fn upsert_team(conn: &Connection, r: &TeamRow) -> Result<()> {
    conn.execute(
        UPSERT_TEAM,
        params![
            r.id,
            r.name,
            r.slug,
            r.short_name,
            r.country_alpha2,
            r.national,
            r.disabled,
            r.team_type,
            r.foundation_ts,
            to_text(&r.colors),
            to_text(&r.translations)
        ],
    )
    .with_context(|| format!("upsert team {}", r.id))?;
    Ok(())
}

pub fn upsert_player(conn: &Connection, r: &PlayerRow) -> Result<()> {
    conn.execute(
        UPSERT_PLAYER,
        params![
            r.id,
            r.name,
            r.slug,
            r.short_name,
            r.position,
            r.jersey_number,
            r.height,
            r.date_of_birth_ts,
            r.country_alpha2,
            r.market_value_eur,
            to_text(&r.extra)
        ],
    )
    .with_context(|| format!("upsert player {}", r.id))?;
    Ok(())
}

pub fn upsert_venue(conn: &Connection, r: &VenueRow) -> Result<()> {
    conn.execute(
        UPSERT_VENUE,
        params![
            r.id,
            r.name,
            r.slug,
            r.city,
            r.capacity,
            r.country_alpha2,
            r.lat,
            r.lon,
            to_text(&r.translations)
        ],
    )
    .with_context(|| format!("upsert venue {}", r.id))?;
    Ok(())
}

pub fn upsert_referee(conn: &Connection, r: &RefereeRow) -> Result<()> {
    conn.execute(
        UPSERT_REFEREE,
        params![r.id, r.name, r.country_alpha2, to_text(&r.stats)],
    )
    .with_context(|| format!("upsert referee {}", r.id))?;
    Ok(())
}

pub fn upsert_event(conn: &Connection, r: &EventRow) -> Result<()> {
    conn.execute(
        UPSERT_EVENT,
        params![
            r.id,
            r.slug,
            r.tournament_id,
            r.season_id,
            r.round,
            r.round_name,
            r.status_code,
            r.status_desc,
            r.status_type,
            r.winner_code,
            r.start_ts,
            r.final_result_only,
            r.venue_id,
            r.referee_id,
            r.has_player_stats,
            r.has_player_heatmap,
            to_text(&r.extra)
        ],
    )
    .with_context(|| format!("upsert event {}", r.id))?;
    Ok(())
}

pub fn upsert_event_team(conn: &Connection, r: &EventTeamRow) -> Result<()> {
    conn.execute(
        UPSERT_EVENT_TEAM,
        params![r.event_id, r.team_id, r.side.as_str()],
    )
    .with_context(|| format!("upsert event team {} {}", r.event_id, r.side.as_str()))?;
    Ok(())
}

pub fn upsert_event_score(conn: &Connection, r: &EventScoreRow) -> Result<()> {
    conn.execute(
        UPSERT_EVENT_SCORE,
        params![
            r.event_id,
            r.home_current,
            r.away_current,
            r.home_display,
            r.away_display,
            r.home_p1,
            r.away_p1,
            r.home_p2,
            r.away_p2,
            r.home_normaltime,
            r.away_normaltime,
            r.home_pen,
            r.away_pen
        ],
    )
    .with_context(|| format!("upsert event score {}", r.event_id))?;
    Ok(())
}

pub fn upsert_lineup(conn: &Connection, r: &LineupRow) -> Result<()> {
    conn.execute(
        UPSERT_LINEUP,
        params![r.event_id, r.team_id, r.formation, r.confirmed],
    )
    .with_context(|| format!("upsert lineup {} team {}", r.event_id, r.team_id))?;
    Ok(())
}

pub fn upsert_lineup_player(conn: &Connection, r: &LineupPlayerRow) -> Result<()> {
    conn.execute(
        UPSERT_LINEUP_PLAYER,
        params![
            r.event_id,
            r.team_id,
            r.player_id,
            r.position,
            r.shirt_number,
            r.role.as_str(),
            r.country_alpha2
        ],
    )
    .with_context(|| format!("upsert lineup player {} in {}", r.player_id, r.event_id))?;
    Ok(())
}

/// Returns the number of new points; existing `seq` slots are left untouched.
pub fn insert_heatmap_point(
    conn: &Connection,
    event_id: i64,
    player_id: i64,
    p: &HeatmapPoint,
) -> Result<usize> {
    conn.execute(
        UPSERT_HEATMAP_POINT,
        params![event_id, player_id, p.seq, p.x, p.y],
    )
    .with_context(|| format!("insert heatmap point {event_id}/{player_id}/{}", p.seq))
}

pub fn upsert_transfer(conn: &Connection, r: &TransferRow) -> Result<()> {
    conn.execute(
        UPSERT_TRANSFER,
        params![
            r.id,
            r.player_id,
            r.from_team_id,
            r.to_team_id,
            r.transfer_fee_eur,
            r.transfer_fee_desc,
            r.transfer_ts
        ],
    )
    .with_context(|| format!("upsert transfer {}", r.id))?;
    Ok(())
}

pub fn upsert_player_statistics(conn: &Connection, r: &PlayerStatisticRow) -> Result<()> {
    conn.execute(
        UPSERT_PLAYER_STATISTICS,
        params![r.event_id, r.player_id, r.rating, to_text(&r.stats)],
    )
    .with_context(|| format!("upsert player statistics {}/{}", r.event_id, r.player_id))?;
    Ok(())
}

pub fn upsert_team_statistics(conn: &Connection, r: &TeamStatisticRow) -> Result<()> {
    conn.execute(
        UPSERT_TEAM_STATISTICS,
        params![r.event_id, r.team_id, r.side.as_str(), to_text(&r.stats)],
    )
    .with_context(|| format!("upsert team statistics {}/{}", r.event_id, r.team_id))?;
    Ok(())
}

pub fn upsert_standing(conn: &Connection, r: &StandingRow) -> Result<()> {
    conn.execute(
        UPSERT_STANDING,
        params![
            r.tournament_id,
            r.season_id,
            r.group_name,
            r.team_id,
            r.rank,
            r.played,
            r.wins,
            r.draws,
            r.losses,
            r.gf,
            r.ga,
            r.gd,
            r.points,
            to_text(&r.extra)
        ],
    )
    .with_context(|| format!("upsert standing {}/{}", r.tournament_id, r.team_id))?;
    Ok(())
}

pub fn insert_featured_event(conn: &Connection, tournament_id: i64, event_id: i64) -> Result<()> {
    conn.execute(UPSERT_FEATURED_EVENT, params![tournament_id, event_id])
        .with_context(|| format!("insert featured event {tournament_id}/{event_id}"))?;
    Ok(())
}

pub fn upsert_video(conn: &Connection, r: &VideoRow) -> Result<()> {
    conn.execute(
        UPSERT_VIDEO,
        params![r.tournament_id, r.season_id, r.video_id, to_text(&r.payload)],
    )
    .with_context(|| format!("upsert video {}", r.video_id))?;
    Ok(())
}

pub fn upsert_trending_player(conn: &Connection, r: &TrendingPlayerRow) -> Result<()> {
    conn.execute(
        UPSERT_TRENDING_PLAYER,
        params![r.player_id, r.event_id, r.rating, to_text(&r.payload)],
    )
    .with_context(|| format!("upsert trending player {}", r.player_id))?;
    Ok(())
}

pub fn upsert_suggestion(conn: &Connection, r: &SuggestionRow) -> Result<()> {
    conn.execute(
        UPSERT_SUGGESTION,
        params![r.entity_type, r.entity_id, r.score, to_text(&r.payload)],
    )
    .with_context(|| format!("upsert suggestion {}:{}", r.entity_type, r.entity_id))?;
    Ok(())
}

pub fn upsert_live_category_count(conn: &Connection, r: &LiveCategoryCountRow) -> Result<()> {
    conn.execute(
        UPSERT_LIVE_CATEGORY_COUNT,
        params![r.category_id, r.live_count],
    )
    .with_context(|| format!("upsert live count {}", r.category_id))?;
    Ok(())
}

pub fn upsert_event_count_by_sport(conn: &Connection, r: &EventCountBySportRow) -> Result<()> {
    conn.execute(
        UPSERT_EVENT_COUNT_BY_SPORT,
        params![r.sport_slug, r.live, r.total],
    )
    .with_context(|| format!("upsert event count {}", r.sport_slug))?;
    Ok(())
}

pub fn upsert_image(conn: &Connection, r: &ImageRow) -> Result<()> {
    let fetched_at = Utc::now().to_rfc3339();
    let res = match r.owner {
        ImageOwner::Player => conn.execute(
            UPSERT_PLAYER_IMAGE,
            params![r.owner_id, r.url, r.kind, fetched_at],
        ),
        ImageOwner::Team => conn.execute(
            UPSERT_TEAM_IMAGE,
            params![
                r.owner_id,
                r.kind.as_deref().unwrap_or("full"),
                r.url,
                fetched_at
            ],
        ),
        ImageOwner::Tournament => conn.execute(
            UPSERT_TOURNAMENT_IMAGE,
            params![r.owner_id, r.url, fetched_at],
        ),
    };
    res.with_context(|| format!("upsert {:?} image {}", r.owner, r.owner_id))?;
    Ok(())
}

/// Upserts an embedded country object, returning its key when one was stored.
pub fn store_country(conn: &Connection, v: &Value) -> Result<Option<String>> {
    let Some(country) = map_country(v) else {
        return Ok(None);
    };
    upsert_country(conn, &country)?;
    Ok(Some(country.alpha2))
}

/// Category plus the sport it belongs to, so the category's reference resolves.
pub fn store_category(conn: &Connection, v: &Value) -> Result<Option<i64>> {
    let Some(category) = map_category(v) else {
        return Ok(None);
    };
    match v.get("sport").and_then(map_sport) {
        Some(sport) => upsert_sport(conn, &sport)?,
        None if category.sport_id == crate::rows::FOOTBALL_SPORT_ID => {
            upsert_sport(conn, &SportRow::football())?
        }
        None => {}
    }
    upsert_category(conn, &category)?;
    Ok(Some(category.id))
}

pub fn store_unique_tournament(conn: &Connection, v: &Value) -> Result<Option<i64>> {
    let Some(row) = map_unique_tournament(v) else {
        return Ok(None);
    };
    if let Some(category) = v.get("category") {
        store_category(conn, category)?;
    }
    upsert_unique_tournament(conn, &row)?;
    Ok(Some(row.id))
}

pub fn store_team(conn: &Connection, v: &Value) -> Result<Option<i64>> {
    let Some(team) = map_team(v) else {
        return Ok(None);
    };
    if let Some(country) = v.get("country") {
        store_country(conn, country)?;
    }
    upsert_team(conn, &team)?;
    Ok(Some(team.id))
}

/// Player row whose country may be referenced; the country row is created from
/// the alpha2 code alone when no richer object is available.
pub fn store_player(conn: &Connection, player: &PlayerRow, country: Option<&Value>) -> Result<()> {
    let stored = match country {
        Some(v) => store_country(conn, v)?,
        None => None,
    };
    if stored.is_none()
        && let Some(alpha2) = &player.country_alpha2
    {
        ensure_country_code(conn, alpha2)?;
    }
    upsert_player(conn, player)
}

fn ensure_country_code(conn: &Connection, alpha2: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO countries (alpha2) VALUES (?1) ON CONFLICT(alpha2) DO NOTHING",
        params![alpha2],
    )
    .with_context(|| format!("ensure country {alpha2}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{map_event, map_event_score};
    use crate::schema::{open_in_memory, row_count};
    use serde_json::json;

    #[test]
    fn team_upsert_is_last_write_wins() {
        let conn = open_in_memory().unwrap();
        store_team(&conn, &json!({"id": 7, "name": "Old", "country": {"alpha2": "EN", "name": "England"}}))
            .unwrap();
        store_team(&conn, &json!({"id": 7, "name": "New"})).unwrap();
        assert_eq!(row_count(&conn, "teams").unwrap(), 1);
        let (name, country): (String, Option<String>) = conn
            .query_row("SELECT name, country_alpha2 FROM teams WHERE id = 7", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "New");
        assert_eq!(country, None);
    }

    #[test]
    fn category_without_sport_seeds_football() {
        let conn = open_in_memory().unwrap();
        let id = store_category(&conn, &json!({"id": 1, "name": "England"})).unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(row_count(&conn, "sports").unwrap(), 1);
    }

    #[test]
    fn event_and_score_upsert_twice_keeps_one_row() {
        let conn = open_in_memory().unwrap();
        let e = json!({"id": 11, "homeScore": {"current": 1}, "awayScore": {"current": 0}});
        for _ in 0..2 {
            upsert_event(&conn, &map_event(&e, None, None).unwrap()).unwrap();
            upsert_event_score(&conn, &map_event_score(&e).unwrap()).unwrap();
        }
        assert_eq!(row_count(&conn, "events").unwrap(), 1);
        assert_eq!(row_count(&conn, "event_scores").unwrap(), 1);
    }

    #[test]
    fn team_image_defaults_to_full_size() {
        let conn = open_in_memory().unwrap();
        upsert_image(
            &conn,
            &ImageRow {
                owner: ImageOwner::Team,
                owner_id: 3,
                url: Some("https://img/3".to_string()),
                kind: None,
            },
        )
        .unwrap();
        let size: String = conn
            .query_row("SELECT size FROM images_team WHERE team_id = 3", [], |r| r.get(0))
            .unwrap();
        assert_eq!(size, "full");
    }
}
