//! All-Stars league standings.
//!
//! A deterministic fold over the season's All-Stars nights:
//! 1. Pick the nights with both captains assigned and night data present
//! 2. Score every league player per night: stat + series bonus
//! 3. Drop each player's worst nights, one per captain token, keeping at
//!    least one night
//! 4. Rank within each league and annotate movement against the previous
//!    night

pub mod series;

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::calculate::mean;
use crate::models::{
    AllStarsConfig, CaptainRecord, NightAvgByDate, NightAvgRow, NightBreakdown, PlayerStanding,
    PositionChange, SonmacByDate, StandingsReport, TeamKey,
};

pub use series::{main_league_maps, map_record, player_team, series_bucket};

/// Nights played and captain tokens needed to meet the league criteria.
pub const KRITERIA_MIN_NIGHTS: u32 = 5;
pub const KRITERIA_MIN_CAPTAINCIES: u32 = 1;

/// Everything the standings are computed from.
#[derive(Debug, Clone, Copy)]
pub struct StandingsInput<'a> {
    pub night_avg: &'a NightAvgByDate,
    pub sonmac: &'a SonmacByDate,
    pub captains: &'a [CaptainRecord],
    pub config: &'a AllStarsConfig,
    pub season_start: NaiveDate,
}

impl<'a> StandingsInput<'a> {
    fn night_rows(&self, date: NaiveDate) -> Option<&'a [NightAvgRow]> {
        self.night_avg
            .get(&date_key(date))
            .map(Vec::as_slice)
            .filter(|rows| !rows.is_empty())
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// All-Stars nights of the season, ascending: on or after the season start,
/// both team slots have a captain, and night averages exist.
pub fn included_nights(input: &StandingsInput) -> Vec<NaiveDate> {
    let mut slots: HashMap<NaiveDate, BTreeSet<TeamKey>> = HashMap::new();
    for captain in input.captains {
        slots.entry(captain.date).or_default().insert(captain.team_key);
    }

    let mut dates: Vec<NaiveDate> = slots
        .into_iter()
        .filter(|(date, keys)| {
            *date >= input.season_start
                && keys.contains(&TeamKey::Team1)
                && keys.contains(&TeamKey::Team2)
        })
        .map(|(date, _)| date)
        .filter(|date| {
            let has_rows = input.night_rows(*date).is_some();
            if !has_rows {
                debug!("Captains set for {} but no night averages yet", date);
            }
            has_rows
        })
        .collect();
    dates.sort();
    dates
}

/// Score one player's night. `None` when the player did not play a league
/// map, has no value for the scoring stat, or the series was undecided.
pub fn score_player_night(
    input: &StandingsInput,
    date: NaiveDate,
    steam_id: &str,
) -> Option<NightBreakdown> {
    let night = input.sonmac.get(&date_key(date))?;
    let maps = main_league_maps(night);
    let team_name = player_team(&maps, steam_id)?;

    let row = input.night_rows(date)?.iter().find(|r| r.steam_id == steam_id)?;
    let Some(stat) = row.stat(&input.config.use_stat) else {
        debug!("{} has no '{}' on {}", steam_id, input.config.use_stat, date);
        return None;
    };

    let Some(bucket) = series_bucket(&maps, team_name) else {
        debug!("Undecided series for {} on {}", team_name, date);
        return None;
    };
    let series_points = input.config.series_points.get(bucket);

    Some(NightBreakdown {
        date,
        team_name: team_name.to_string(),
        stat,
        bucket,
        series_points,
        points: stat + series_points,
        dropped: false,
        was_captain: input
            .captains
            .iter()
            .any(|c| c.date == date && c.steam_id == steam_id),
    })
}

/// Mark the `drop_count` lowest-scoring nights as dropped (earlier night
/// first on equal points). Returns `(puan_raw, puan_adj)`.
pub fn apply_drops(nights: &mut [NightBreakdown], drop_count: usize) -> (f64, f64) {
    let mut order: Vec<usize> = (0..nights.len()).collect();
    order.sort_by(|&a, &b| {
        nights[a]
            .points
            .total_cmp(&nights[b].points)
            .then(nights[a].date.cmp(&nights[b].date))
    });
    for &i in order.iter().take(drop_count) {
        nights[i].dropped = true;
    }

    let all: Vec<f64> = nights.iter().map(|n| n.points).collect();
    let kept: Vec<f64> = nights.iter().filter(|n| !n.dropped).map(|n| n.points).collect();
    (mean(&all), mean(&kept))
}

/// Nights a player may drop: one per captain token, always keeping one.
pub fn drop_count(kpt: u32, oyn: u32) -> usize {
    kpt.min(oyn.saturating_sub(1)) as usize
}

fn rank(standings: &mut [PlayerStanding]) {
    standings.sort_by(|a, b| {
        b.puan_adj
            .total_cmp(&a.puan_adj)
            .then(b.puan_raw.total_cmp(&a.puan_raw))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.steam_id.cmp(&b.steam_id))
    });
}

/// Standings over the first `up_to_night` All-Stars nights (all when `None`).
/// Every player is marked `new`; see [`compute_with_movement`].
pub fn compute_standings(input: &StandingsInput, up_to_night: Option<usize>) -> StandingsReport {
    let all_nights = included_nights(input);
    let total_nights = all_nights.len();
    let mut dates = all_nights;
    if let Some(n) = up_to_night {
        dates.truncate(n);
    }

    let mut report = StandingsReport {
        total_nights,
        season_start: Some(input.season_start),
        ..Default::default()
    };
    if total_nights == 0 {
        report
            .warnings
            .push("No All-Stars night yet this season".to_string());
    }

    let mut scored: HashMap<&str, Option<PlayerStanding>> = HashMap::new();
    for league in &input.config.leagues {
        let mut standings = Vec::new();
        for steam_id in &league.players {
            let standing = scored
                .entry(steam_id.as_str())
                .or_insert_with(|| player_standing(input, &dates, steam_id));
            match standing {
                Some(s) => standings.push(s.clone()),
                None if total_nights > 0 => report.warnings.push(format!(
                    "League '{}': player {} has no scored night",
                    league.name, steam_id
                )),
                None => {}
            }
        }
        rank(&mut standings);
        report.leagues.insert(league.id.clone(), standings);
    }

    report.included_dates = dates;
    report
}

fn player_standing(
    input: &StandingsInput,
    dates: &[NaiveDate],
    steam_id: &str,
) -> Option<PlayerStanding> {
    let mut nights: Vec<NightBreakdown> = dates
        .iter()
        .filter_map(|&date| score_player_night(input, date, steam_id))
        .collect();
    if nights.is_empty() {
        return None;
    }

    let oyn = nights.len() as u32;
    let kpt = input
        .captains
        .iter()
        .filter(|c| c.steam_id == steam_id && dates.contains(&c.date))
        .count() as u32;
    let (puan_raw, puan_adj) = apply_drops(&mut nights, drop_count(kpt, oyn));

    Some(PlayerStanding {
        steam_id: steam_id.to_string(),
        name: display_name(input, &nights, steam_id),
        oyn,
        kpt,
        puan_raw,
        puan_adj,
        night_breakdown: nights,
        meets_kriteria: oyn >= KRITERIA_MIN_NIGHTS && kpt >= KRITERIA_MIN_CAPTAINCIES,
        position_change: PositionChange::New,
    })
}

/// Name from the player's latest scored night.
fn display_name(input: &StandingsInput, nights: &[NightBreakdown], steam_id: &str) -> String {
    nights
        .iter()
        .rev()
        .find_map(|n| {
            input
                .night_rows(n.date)?
                .iter()
                .find(|r| r.steam_id == steam_id)
                .map(|r| r.name.clone())
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| steam_id.to_string())
}

/// Label each standing against the previous ranking of the same league.
pub fn annotate_movement(current: &mut [PlayerStanding], previous: &[PlayerStanding]) {
    for (i, standing) in current.iter_mut().enumerate() {
        standing.position_change = match previous.iter().position(|p| p.steam_id == standing.steam_id) {
            None => PositionChange::New,
            Some(j) if j > i => PositionChange::Up,
            Some(j) if j < i => PositionChange::Down,
            Some(_) => PositionChange::Same,
        };
    }
}

/// Standings with position changes relative to one night earlier.
pub fn compute_with_movement(input: &StandingsInput, up_to_night: Option<usize>) -> StandingsReport {
    let mut report = compute_standings(input, up_to_night);
    let nights = report.included_dates.len();
    if nights > 0 {
        let previous = compute_standings(input, Some(nights - 1));
        for (league_id, standings) in report.leagues.iter_mut() {
            let before = previous.leagues.get(league_id).map(Vec::as_slice).unwrap_or(&[]);
            annotate_movement(standings, before);
        }
    }

    info!(
        "Computed standings for {} leagues over {} of {} nights",
        report.leagues.len(),
        nights,
        report.total_nights
    );
    report
}
