//! SQL behind each dataset.
//!
//! All queries read the denormalized `player_match_stats` table (one row per
//! player per map played) and `kill_events` (one row per kill). Season
//! bounds are rendered from a typed date, never from user text.

use chrono::NaiveDate;

/// Latest ingestion timestamp of match data.
pub const LAST_MODIFIED: &str = "SELECT MAX(created_at) AS last_modified FROM player_match_stats";

/// Interval aggregate columns shared by the season and last-10 queries.
const INTERVAL_COLUMNS: &str = r#"
    s.steam_id,
    MAX(s.player_name) AS name,
    AVG(s.hltv_rating_2)::float8 AS hltv_2,
    AVG(s.adr)::float8 AS adr,
    (SUM(s.kills)::float8 / NULLIF(SUM(s.deaths), 0))::float8 AS kd,
    AVG(s.mvps)::float8 AS mvp,
    AVG(s.kills)::float8 AS kills,
    AVG(s.deaths)::float8 AS deaths,
    AVG(s.assists)::float8 AS assists,
    (SUM(s.headshot_kills)::float8 * 100 / NULLIF(SUM(s.kills), 0))::float8 AS hs_ratio,
    AVG(s.first_kills)::float8 AS first_kill,
    AVG(s.first_deaths)::float8 AS first_death,
    AVG(s.bomb_planted)::float8 AS bomb_planted,
    AVG(s.bomb_defused)::float8 AS bomb_defused,
    SUM(CASE WHEN s.won THEN 1 ELSE 0 END)::int8 AS wins,
    COUNT(DISTINCT s.match_id)::int8 AS matches_in_interval,
    SUM(s.clutch_attempts)::int8 AS total_clutches,
    SUM(s.clutches_won)::int8 AS total_clutches_won"#;

fn date_literal(date: NaiveDate) -> String {
    format!("DATE '{}'", date.format("%Y-%m-%d"))
}

/// Per-player averages since the season start.
pub fn season_avg(season_start: NaiveDate) -> String {
    format!(
        r#"SELECT {columns}
FROM player_match_stats s
WHERE s.match_date::date >= {start}
GROUP BY s.steam_id
ORDER BY hltv_2 DESC NULLS LAST"#,
        columns = INTERVAL_COLUMNS,
        start = date_literal(season_start),
    )
}

/// Per-player averages over each player's last 10 distinct match dates.
pub fn last10() -> String {
    format!(
        r#"WITH player_dates AS (
    SELECT steam_id, match_date::date AS night,
           DENSE_RANK() OVER (PARTITION BY steam_id ORDER BY match_date::date DESC) AS recency
    FROM player_match_stats
    GROUP BY steam_id, match_date::date
)
SELECT {columns}
FROM player_match_stats s
JOIN player_dates d
  ON d.steam_id = s.steam_id AND d.night = s.match_date::date AND d.recency <= 10
GROUP BY s.steam_id
ORDER BY hltv_2 DESC NULLS LAST"#,
        columns = INTERVAL_COLUMNS,
    )
}

/// Per-player, per-night averages over the whole history.
pub const NIGHT_AVG: &str = r#"SELECT
    s.steam_id,
    MAX(s.player_name) AS name,
    s.match_date::date AS match_date,
    AVG(s.hltv_rating)::float8 AS hltv,
    AVG(s.hltv_rating_2)::float8 AS hltv_2,
    AVG(s.adr)::float8 AS adr,
    (SUM(s.kills)::float8 / NULLIF(SUM(s.deaths), 0))::float8 AS kd,
    AVG(s.mvps)::float8 AS mvp,
    AVG(s.kills)::float8 AS kills,
    AVG(s.deaths)::float8 AS deaths,
    AVG(s.assists)::float8 AS assists,
    AVG(s.headshot_kills)::float8 AS headshots,
    (SUM(s.headshot_kills)::float8 * 100 / NULLIF(SUM(s.kills), 0))::float8 AS hs_ratio,
    AVG(s.first_kills)::float8 AS first_kill,
    AVG(s.first_deaths)::float8 AS first_death,
    AVG(s.bomb_planted)::float8 AS bomb_planted,
    AVG(s.bomb_defused)::float8 AS bomb_defused,
    COUNT(DISTINCT s.match_id)::int8 AS matches_played,
    SUM(s.clutch_attempts)::int8 AS total_clutches,
    SUM(s.clutches_won)::int8 AS total_clutches_won
FROM player_match_stats s
GROUP BY s.steam_id, s.match_date::date
ORDER BY match_date, s.steam_id"#;

/// Per-night, per-map, per-team player lines in play order.
pub const SONMAC_BY_DATE: &str = r#"SELECT
    s.match_date::date AS match_date,
    s.map_name,
    s.team_name,
    MAX(s.team_score)::int8 AS team_score,
    s.steam_id,
    MAX(s.player_name) AS name,
    AVG(s.kills)::float8 AS kills,
    AVG(s.deaths)::float8 AS deaths,
    AVG(s.assists)::float8 AS assists,
    (SUM(s.kills)::float8 / NULLIF(SUM(s.deaths), 0))::float8 AS kd,
    AVG(s.adr)::float8 AS adr,
    AVG(s.hltv_rating_2)::float8 AS hltv_2,
    (SUM(s.headshot_kills)::float8 * 100 / NULLIF(SUM(s.kills), 0))::float8 AS hs_ratio,
    AVG(s.mvps)::float8 AS mvp,
    AVG(s.first_kills)::float8 AS first_kill,
    AVG(s.first_deaths)::float8 AS first_death,
    AVG(s.clutches_won)::float8 AS clutches_won
FROM player_match_stats s
GROUP BY s.match_date::date, s.map_name, s.team_name, s.steam_id
ORDER BY match_date, MIN(s.match_date), s.team_name, hltv_2 DESC NULLS LAST"#;

fn duel_query(filter: &str) -> String {
    format!(
        r#"WITH scoped AS (
    SELECT k.killer_steam_id, k.victim_steam_id
    FROM kill_events k
    JOIN (SELECT DISTINCT match_id, match_date FROM player_match_stats) m ON m.match_id = k.match_id
    WHERE {filter}
),
names AS (
    SELECT steam_id, MAX(player_name) AS name FROM player_match_stats GROUP BY steam_id
),
pairs AS (
    SELECT a.steam_id AS row_steam_id, b.steam_id AS col_steam_id
    FROM (SELECT killer_steam_id AS steam_id FROM scoped UNION SELECT victim_steam_id FROM scoped) a
    CROSS JOIN (SELECT killer_steam_id AS steam_id FROM scoped UNION SELECT victim_steam_id FROM scoped) b
)
SELECT
    p.row_steam_id,
    rn.name AS row_name,
    p.col_steam_id,
    cn.name AS col_name,
    (SELECT COUNT(*) FROM scoped WHERE killer_steam_id = p.row_steam_id AND victim_steam_id = p.col_steam_id)
    || '/' ||
    (SELECT COUNT(*) FROM scoped WHERE killer_steam_id = p.col_steam_id AND victim_steam_id = p.row_steam_id)
    AS duel
FROM pairs p
LEFT JOIN names rn ON rn.steam_id = p.row_steam_id
LEFT JOIN names cn ON cn.steam_id = p.col_steam_id"#,
        filter = filter,
    )
}

/// Duels of the most recent match night.
pub fn duello_son_mac() -> String {
    duel_query("m.match_date::date = (SELECT MAX(match_date)::date FROM player_match_stats)")
}

/// Duels since the season start.
pub fn duello_sezon(season_start: NaiveDate) -> String {
    duel_query(&format!("m.match_date::date >= {}", date_literal(season_start)))
}

/// Every player × every night since the season start, null where the
/// player did not play.
pub fn performance(season_start: NaiveDate) -> String {
    format!(
        r#"WITH nights AS (
    SELECT DISTINCT match_date::date AS night
    FROM player_match_stats
    WHERE match_date::date >= {start}
),
players AS (
    SELECT steam_id, MAX(player_name) AS name
    FROM player_match_stats
    WHERE match_date::date >= {start}
    GROUP BY steam_id
),
nightly AS (
    SELECT steam_id, match_date::date AS night,
           AVG(hltv_rating_2)::float8 AS hltv_2,
           AVG(adr)::float8 AS adr
    FROM player_match_stats
    WHERE match_date::date >= {start}
    GROUP BY steam_id, match_date::date
)
SELECT p.steam_id, p.name, n.night AS match_date, x.hltv_2, x.adr
FROM players p
CROSS JOIN nights n
LEFT JOIN nightly x ON x.steam_id = p.steam_id AND x.night = n.night
ORDER BY p.name, n.night"#,
        start = date_literal(season_start),
    )
}
