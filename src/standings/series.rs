//! Night series: which maps count for the league and how a team fared.

use crate::models::{MapResult, SeriesBucket, SonmacNight};

/// Maps of a night that count for league scoring.
///
/// With exactly three maps, a third map between a different pair of teams
/// than the first two is a casual match and is left out. Nights with any
/// other map count keep every map.
pub fn main_league_maps(night: &SonmacNight) -> Vec<&MapResult> {
    let maps: Vec<&MapResult> = night.iter().map(|(_, m)| m).collect();
    if maps.len() == 3 {
        let series_pair = maps[0].team_pair();
        if maps[1].team_pair() == series_pair && maps[2].team_pair() != series_pair {
            return maps[..2].to_vec();
        }
    }
    maps
}

/// Team the player turned out for, from the first map listing them.
pub fn player_team<'a>(maps: &[&'a MapResult], steam_id: &str) -> Option<&'a str> {
    maps.iter().find_map(|m| {
        if m.team1.has_player(steam_id) {
            Some(m.team1.name.as_str())
        } else if m.team2.has_player(steam_id) {
            Some(m.team2.name.as_str())
        } else {
            None
        }
    })
}

/// Map wins and losses of `team_name`. Maps without an opponent and drawn
/// maps count for neither side.
pub fn map_record(maps: &[&MapResult], team_name: &str) -> (u32, u32) {
    maps.iter()
        .filter_map(|m| m.side(team_name))
        .filter(|(_, other)| !other.name.is_empty())
        .fold((0, 0), |(wins, losses), (own, other)| {
            if own.score > other.score {
                (wins + 1, losses)
            } else if own.score < other.score {
                (wins, losses + 1)
            } else {
                (wins, losses)
            }
        })
}

/// Series outcome for `team_name`, `None` when no map was decided.
pub fn series_bucket(maps: &[&MapResult], team_name: &str) -> Option<SeriesBucket> {
    let (wins, losses) = map_record(maps, team_name);
    SeriesBucket::classify(wins, losses)
}
