//! Seeded synthetic league used by the report tool, the benches and tests.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{GameRecord, PlayerBoxScore, PlayerStatLine, TeamBoxScore, TeamStatLine};

const TEAM_NAMES: [&str; 16] = [
    "Harbor Herons",
    "Valley Vipers",
    "North Lights",
    "Desert Foxes",
    "Coastal Kings",
    "River Rockets",
    "Summit Bears",
    "Metro Hawks",
    "Iron Owls",
    "Garden Giants",
    "Canyon Comets",
    "Bay Bullets",
    "Pine Wolves",
    "Lake Lancers",
    "Stone Storm",
    "Port Pilots",
];
const STARTERS: usize = 5;

#[derive(Debug, Clone)]
pub struct SyntheticLeague {
    pub teams: usize,
    /// Each round every team plays once. Home side alternates between rounds.
    pub rounds: usize,
    pub players_per_team: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub season: String,
    /// Emit fast-break, paint, second-chance and turnover splits in team boxes.
    pub advanced_stats: bool,
}

impl Default for SyntheticLeague {
    fn default() -> Self {
        Self {
            teams: 12,
            rounds: 22,
            players_per_team: 10,
            seed: 7,
            start: NaiveDate::from_ymd_opt(2025, 10, 4).unwrap_or(NaiveDate::MIN),
            season: "2025-26".to_string(),
            advanced_stats: true,
        }
    }
}

struct TeamProfile {
    name: String,
    /// Player ids are `id_base + slot`.
    id_base: u32,
    /// Per-quarter scoring edge.
    strength: i32,
    three_rate: f64,
}

impl SyntheticLeague {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn team_names(&self) -> Vec<String> {
        (0..self.teams.max(2))
            .map(|i| match TEAM_NAMES.get(i) {
                Some(name) => name.to_string(),
                None => format!("Team {}", i + 1),
            })
            .collect()
    }

    /// Round-robin schedule by the circle method, oldest game first.
    pub fn generate(&self) -> Vec<GameRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let profiles: Vec<TeamProfile> = self
            .team_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| TeamProfile {
                name,
                id_base: (i as u32 + 1) * 100,
                strength: rng.gen_range(-3..=3),
                three_rate: rng.gen_range(0.25..0.55),
            })
            .collect();

        let mut order: Vec<usize> = (0..profiles.len()).collect();
        if order.len() % 2 == 1 {
            // Odd leagues get a bye slot.
            order.push(usize::MAX);
        }
        let n = order.len();
        let mut games = Vec::new();
        for round in 0..self.rounds {
            let date = self.start + Duration::days(round as i64 * 3);
            for slot in 0..n / 2 {
                let (x, y) = (order[slot], order[n - 1 - slot]);
                if x == usize::MAX || y == usize::MAX {
                    continue;
                }
                let (home, away) = if (round + slot) % 2 == 0 { (x, y) } else { (y, x) };
                let id = format!("{}-{round:02}-{slot}", self.season);
                games.push(self.play(&mut rng, &id, date, &profiles[home], &profiles[away]));
            }
            // Keep the first entry fixed and rotate the rest.
            order[1..].rotate_right(1);
        }
        games
    }

    fn play(
        &self,
        rng: &mut StdRng,
        id: &str,
        date: NaiveDate,
        home: &TeamProfile,
        away: &TeamProfile,
    ) -> GameRecord {
        let mut home_q = quarters(rng, home.strength + 1);
        let mut away_q = quarters(rng, away.strength);
        let (mut home_score, mut away_score): (u32, u32) = (home_q.iter().sum(), away_q.iter().sum());
        while home_score == away_score {
            // Overtime until somebody wins.
            let (h, a) = (rng.gen_range(6..=14), rng.gen_range(6..=14));
            home_q.push(h);
            away_q.push(a);
            home_score += h;
            away_score += a;
        }

        let mut players = self.box_players(rng, home, home_score);
        players.extend(self.box_players(rng, away, away_score));
        let home_stats = self.team_stats(rng, home, home_score, &players);
        let away_stats = self.team_stats(rng, away, away_score, &players);

        GameRecord {
            id: id.to_string(),
            date,
            season: Some(self.season.clone()),
            teams: vec![
                TeamBoxScore {
                    name: home.name.clone(),
                    is_home: true,
                    score: home_score,
                    quarters: home_q,
                    stats: Some(home_stats),
                },
                TeamBoxScore {
                    name: away.name.clone(),
                    is_home: false,
                    score: away_score,
                    quarters: away_q,
                    stats: Some(away_stats),
                },
            ],
            players,
        }
    }

    fn box_players(&self, rng: &mut StdRng, team: &TeamProfile, score: u32) -> Vec<PlayerBoxScore> {
        let count = self.players_per_team.max(STARTERS);
        let weights: Vec<u32> = (0..count)
            .map(|i| if i < STARTERS { rng.gen_range(6..=14) } else { rng.gen_range(1..=6) })
            .collect();
        let total: u32 = weights.iter().sum();
        let mut points: Vec<u32> = weights.iter().map(|w| score * w / total.max(1)).collect();
        let assigned: u32 = points.iter().sum();
        points[0] += score - assigned;

        points
            .into_iter()
            .enumerate()
            .map(|(i, pts)| {
                let starter = i < STARTERS;
                let three_pm = ((pts as f64 * team.three_rate) / 3.0).floor() as u32;
                let ftm = (pts - three_pm * 3) % 2;
                let two_pm = (pts - three_pm * 3 - ftm) / 2;
                PlayerBoxScore {
                    player_id: team.id_base + i as u32,
                    jersey: Some(((i * 3 + 4) % 100).to_string()),
                    team: team.name.clone(),
                    starter: Some(starter),
                    stats: PlayerStatLine {
                        points: pts,
                        rebounds: rng.gen_range(0..=if starter { 11 } else { 5 }),
                        assists: rng.gen_range(0..=if i == 0 { 9 } else { 4 }),
                        steals: rng.gen_range(0..=2),
                        blocks: rng.gen_range(0..=1),
                        turnovers: rng.gen_range(0..=3),
                        fouls: rng.gen_range(0..=4),
                        two_pm,
                        two_pa: two_pm + rng.gen_range(0..=4),
                        three_pm,
                        three_pa: three_pm + rng.gen_range(0..=4),
                        ftm,
                        fta: ftm + rng.gen_range(0..=2),
                        minutes: if starter {
                            rng.gen_range(24.0..34.0)
                        } else {
                            rng.gen_range(6.0..18.0)
                        },
                        plus_minus: rng.gen_range(-12..=12),
                    },
                }
            })
            .collect()
    }

    fn team_stats(
        &self,
        rng: &mut StdRng,
        team: &TeamProfile,
        score: u32,
        players: &[PlayerBoxScore],
    ) -> TeamStatLine {
        let mut line = TeamStatLine::default();
        let mut bench = 0;
        for p in players.iter().filter(|p| p.team == team.name) {
            let s = &p.stats;
            line.rebounds += s.rebounds;
            line.assists += s.assists;
            line.steals += s.steals;
            line.blocks += s.blocks;
            line.turnovers += s.turnovers;
            line.fouls += s.fouls;
            line.two_pm += s.two_pm;
            line.two_pa += s.two_pa;
            line.three_pm += s.three_pm;
            line.three_pa += s.three_pa;
            line.ftm += s.ftm;
            line.fta += s.fta;
            if p.starter == Some(false) {
                bench += s.points;
            }
        }
        if self.advanced_stats {
            line.bench_points = Some(bench);
            line.paint_points = Some((line.two_pm * 2).min(score) * rng.gen_range(55..=80) / 100);
            line.fast_break_points = Some(rng.gen_range(4..=20));
            line.second_chance_points = Some(rng.gen_range(4..=18));
            line.points_off_turnovers = Some(rng.gen_range(8..=24));
        }
        line
    }
}

fn quarters(rng: &mut StdRng, edge: i32) -> Vec<u32> {
    (0..4)
        .map(|_| (19 + edge + rng.gen_range(-6..=6)).max(8) as u32)
        .collect()
}
