use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::TeamForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Streaks,
    Players,
    Offense,
    Defense,
    Momentum,
    H2h,
    Quarters,
    League,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Streaks,
        Category::Players,
        Category::Offense,
        Category::Defense,
        Category::Momentum,
        Category::H2h,
        Category::Quarters,
        Category::League,
    ];

    /// Key used by template files.
    pub fn key(self) -> &'static str {
        match self {
            Category::Streaks => "streaks",
            Category::Players => "players",
            Category::Offense => "offense",
            Category::Defense => "defense",
            Category::Momentum => "momentum",
            Category::H2h => "h2h",
            Category::Quarters => "quarters",
            Category::League => "league",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Ordered so that sorting ascending puts `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

macro_rules! insight_types {
    ($($variant:ident => ($name:literal, $cat:ident)),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum InsightType {
            $(#[serde(rename = $name)] $variant,)+
        }

        impl InsightType {
            pub const ALL: &'static [InsightType] = &[$(InsightType::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(InsightType::$variant => $name,)+
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $(InsightType::$variant => Category::$cat,)+
                }
            }
        }
    };
}

insight_types! {
    WinningStreak => ("WINNING_STREAK", Streaks),
    ClutchStreak => ("CLUTCH_STREAK", Streaks),
    LosingStreak => ("LOSING_STREAK", Streaks),
    BlowoutWins => ("BLOWOUT_WINS", Streaks),
    CloseLosses => ("CLOSE_LOSSES", Streaks),
    HotHand => ("HOT_HAND", Players),
    ColdSpell => ("COLD_SPELL", Players),
    KillerVsTeam => ("KILLER_VS_TEAM", Players),
    TeamLeader => ("TEAM_LEADER", Players),
    DoubleDoubleMachine => ("DOUBLE_DOUBLE_MACHINE", Players),
    AssistMachine => ("ASSIST_MACHINE", Players),
    ReboundMachine => ("REBOUND_MACHINE", Players),
    MrConsistent => ("MR_CONSISTENT", Players),
    BoomOrBust => ("BOOM_OR_BUST", Players),
    HomeCourtHero => ("HOME_COURT_HERO", Players),
    RisingStar => ("RISING_STAR", Players),
    SuperSub => ("SUPER_SUB", Players),
    ThreePointDependent => ("THREE_POINT_DEPENDENT", Offense),
    PaintDominators => ("PAINT_DOMINATORS", Offense),
    AssistHeavy => ("ASSIST_HEAVY", Offense),
    FreeThrowFactory => ("FREE_THROW_FACTORY", Offense),
    HighScoring => ("HIGH_SCORING", Offense),
    FastBreakKings => ("FAST_BREAK_KINGS", Offense),
    PaintDominance => ("PAINT_DOMINANCE", Offense),
    BenchPower => ("BENCH_POWER", Offense),
    StartingVsBench => ("STARTING_VS_BENCH", Offense),
    SecondChanceMasters => ("SECOND_CHANCE_MASTERS", Offense),
    StrongBench => ("STRONG_BENCH", Offense),
    LineupDependent => ("LINEUP_DEPENDENT", Offense),
    DefensiveWall => ("DEFENSIVE_WALL", Defense),
    ReboundDominance => ("REBOUND_DOMINANCE", Defense),
    TurnoverCreators => ("TURNOVER_CREATORS", Defense),
    BlockParty => ("BLOCK_PARTY", Defense),
    ThreePointDefenseGood => ("THREE_POINT_DEFENSE_GOOD", Defense),
    ThreePointDefenseBad => ("THREE_POINT_DEFENSE_BAD", Defense),
    TurnoverCapitalization => ("TURNOVER_CAPITALIZATION", Defense),
    PointDiffTrend => ("POINT_DIFF_TREND", Momentum),
    ScheduleStrength => ("SCHEDULE_STRENGTH", Momentum),
    SeasonHalves => ("SEASON_HALVES", Momentum),
    DayOfWeek => ("DAY_OF_WEEK", Momentum),
    H2hVenue => ("H2H_VENUE", H2h),
    H2hMarginTrend => ("H2H_MARGIN_TREND", H2h),
    H2hTopScorer => ("H2H_TOP_SCORER", H2h),
    H2hFlip => ("H2H_FLIP", H2h),
    SlowStarters => ("SLOW_STARTERS", Quarters),
    ComebackKings => ("COMEBACK_KINGS", Quarters),
    FourthQuarterCollapse => ("FOURTH_QUARTER_COLLAPSE", Quarters),
    BestQuarter => ("BEST_QUARTER", Quarters),
    QuarterDominance => ("QUARTER_DOMINANCE", Quarters),
    LeagueLeader => ("LEAGUE_LEADER", League),
    AboveAverage => ("ABOVE_AVERAGE", League),
    BelowAverage => ("BELOW_AVERAGE", League),
    BestCategory => ("BEST_CATEGORY", League),
    WorstCategory => ("WORST_CATEGORY", League),
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One narrative finding. `vars` carries the evidence used to phrase it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightType,
    pub category: Category,
    pub importance: Importance,
    pub team: Option<String>,
    pub player_id: Option<u32>,
    pub value: Option<f64>,
    pub vars: BTreeMap<String, String>,
    pub text: String,
    pub text_short: String,
    pub is_fallback: bool,
}

impl Insight {
    pub fn new(kind: InsightType, importance: Importance) -> Self {
        Self {
            kind,
            category: kind.category(),
            importance,
            team: None,
            player_id: None,
            value: None,
            vars: BTreeMap::new(),
            text: String::new(),
            text_short: String::new(),
            is_fallback: false,
        }
    }

    pub fn for_team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self.vars.insert("team".to_string(), team.to_string());
        self
    }

    pub fn player(mut self, player_id: u32, name: &str) -> Self {
        self.player_id = Some(player_id);
        self.vars.insert("player".to_string(), name.to_string());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn var(mut self, key: &str, value: impl ToString) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Default sentence, kept when no template pool is registered.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn short(mut self, text: impl Into<String>) -> Self {
        self.text_short = text.into();
        self
    }

    pub fn fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }

    pub fn belongs_to(&self, team: &str) -> bool {
        self.team.as_deref() == Some(team)
    }

    /// Records a league position under the `rank` variable.
    pub fn ranked(self, rank: Option<usize>) -> Self {
        match rank {
            Some(rank) => self.var("rank", rank),
            None => self,
        }
    }

    pub fn rank(&self) -> Option<usize> {
        self.vars.get("rank").and_then(|r| r.parse().ok())
    }

    /// Editorial weight for broadcast ordering: a per-type base plus bonuses
    /// for importance, a top-3 rank and standout streak or blowout counts.
    pub fn score(&self) -> u32 {
        let mut score = type_weight(self.kind);
        score += match self.importance {
            Importance::High => 15,
            Importance::Medium => 5,
            Importance::Low => 0,
        };
        if self.rank().is_some_and(|r| r <= SCORE_RANK_MAX) {
            score += 20;
        }
        let value = self.value.unwrap_or(0.0);
        let standout = match self.kind {
            InsightType::WinningStreak => value >= 5.0,
            InsightType::BlowoutWins => value >= 3.0,
            _ => false,
        };
        if standout {
            score += 10;
        }
        score
    }
}

const SCORE_RANK_MAX: usize = 3;
const CONFLICT_RANK_MAX: usize = 5;

fn type_weight(kind: InsightType) -> u32 {
    use InsightType as T;
    match kind {
        T::DefensiveWall | T::HighScoring => 80,
        T::WinningStreak => 75,
        T::BlowoutWins | T::LosingStreak => 70,
        T::ClutchStreak | T::HotHand => 65,
        T::TeamLeader => 60,
        T::ComebackKings => 55,
        T::BestQuarter | T::QuarterDominance => 50,
        T::ScheduleStrength => 45,
        T::SeasonHalves => 40,
        _ => 30,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DefensiveBattle,
    Shootout,
    BothOnStreaks,
    BothDominant,
}

/// A storyline where both teams claim the same strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub text: String,
}

/// Composer output: insights grouped by category plus both teams' recent form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchupReport {
    pub team_a: String,
    pub team_b: String,
    pub insights: BTreeMap<Category, Vec<Insight>>,
    pub form_a: Option<TeamForm>,
    pub form_b: Option<TeamForm>,
}

impl MatchupReport {
    pub fn new(team_a: &str, team_b: &str) -> Self {
        Self {
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, insight: Insight) {
        self.insights.entry(insight.category).or_default().push(insight);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Insight> {
        self.insights.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Insight> {
        self.insights.values_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.insights.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn category(&self, category: Category) -> &[Insight] {
        self.insights.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Insights owned by `team`. Matchup-wide findings without an owner are not counted.
    pub fn count_for_team(&self, team: &str) -> usize {
        self.iter().filter(|i| i.belongs_to(team)).count()
    }

    pub fn has(&self, team: &str, kind: InsightType) -> bool {
        self.iter().any(|i| i.kind == kind && i.belongs_to(team))
    }

    pub fn find(&self, team: &str, kind: InsightType) -> Option<&Insight> {
        self.iter().find(|i| i.kind == kind && i.belongs_to(team))
    }

    /// Per category: most important first (stable), capped at `max_per_category`.
    pub fn filter_and_sort(&self, max_per_category: usize) -> BTreeMap<Category, Vec<Insight>> {
        self.insights
            .iter()
            .map(|(cat, list)| {
                let mut list = list.clone();
                list.sort_by_key(|i| i.importance);
                list.truncate(max_per_category);
                (*cat, list)
            })
            .filter(|(_, list)| !list.is_empty())
            .collect()
    }

    pub fn top_insights(&self, n: usize) -> Vec<Insight> {
        let mut all: Vec<Insight> = self.iter().cloned().collect();
        all.sort_by_key(|i| i.importance);
        all.truncate(n);
        all
    }

    /// Highest [`Insight::score`] first; equal scores keep report order.
    pub fn top_by_score(&self, n: usize) -> Vec<Insight> {
        let mut all: Vec<Insight> = self.iter().cloned().collect();
        all.sort_by_key(|i| std::cmp::Reverse(i.score()));
        all.truncate(n);
        all
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        let (a, b) = (self.team_a.as_str(), self.team_b.as_str());
        let pair = |kind: InsightType| Some((self.find(a, kind)?, self.find(b, kind)?));
        let both_ranked = |x: &Insight, y: &Insight| {
            let near_top = |i: &Insight| i.rank().is_some_and(|r| r <= CONFLICT_RANK_MAX);
            near_top(x) && near_top(y)
        };
        let count = |i: &Insight| format!("{:.0}", i.value.unwrap_or(0.0));
        let rank = |i: &Insight| i.rank().unwrap_or_default();

        let mut out = Vec::new();
        if let Some((x, y)) = pair(InsightType::DefensiveWall)
            && both_ranked(x, y)
        {
            out.push(Conflict {
                kind: ConflictKind::DefensiveBattle,
                text: format!("Defensive battle: #{} against #{}", rank(x), rank(y)),
            });
        }
        if let Some((x, y)) = pair(InsightType::HighScoring)
            && both_ranked(x, y)
        {
            out.push(Conflict {
                kind: ConflictKind::Shootout,
                text: format!("Shootout: #{} offense against #{}", rank(x), rank(y)),
            });
        }
        if let Some((x, y)) = pair(InsightType::WinningStreak) {
            out.push(Conflict {
                kind: ConflictKind::BothOnStreaks,
                text: format!("Both in form: {a} has won {} straight, {b} {}", count(x), count(y)),
            });
        }
        if let Some((x, y)) = pair(InsightType::BlowoutWins) {
            out.push(Conflict {
                kind: ConflictKind::BothDominant,
                text: format!("Both dominant: {} and {} wins by 15 or more", count(x), count(y)),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_and_categories() {
        assert_eq!(InsightType::H2hVenue.as_str(), "H2H_VENUE");
        assert_eq!(InsightType::H2hVenue.category(), Category::H2h);
        assert_eq!(InsightType::TurnoverCapitalization.category(), Category::Defense);
        let json = serde_json::to_string(&InsightType::ClutchStreak).unwrap();
        assert_eq!(json, "\"CLUTCH_STREAK\"");
    }

    #[test]
    fn filter_and_sort_caps_each_category() {
        let mut report = MatchupReport::new("A", "B");
        report.push(Insight::new(InsightType::CloseLosses, Importance::Medium).for_team("A"));
        report.push(Insight::new(InsightType::BlowoutWins, Importance::Low).for_team("A"));
        report.push(Insight::new(InsightType::LosingStreak, Importance::High).for_team("B"));
        report.push(Insight::new(InsightType::WinningStreak, Importance::High).for_team("A"));
        let out = report.filter_and_sort(3);
        let kinds: Vec<InsightType> = out[&Category::Streaks].iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightType::LosingStreak,
                InsightType::WinningStreak,
                InsightType::CloseLosses
            ]
        );
    }

    #[test]
    fn unowned_insights_are_not_counted() {
        let mut report = MatchupReport::new("A", "B");
        report.push(Insight::new(InsightType::H2hFlip, Importance::High));
        report.push(Insight::new(InsightType::HotHand, Importance::High).for_team("A"));
        assert_eq!(report.count_for_team("A"), 1);
        assert_eq!(report.count_for_team("B"), 0);
        assert_eq!(report.top_insights(8).len(), 2);
    }

    #[test]
    fn score_adds_importance_rank_and_standout_bonuses() {
        let plain = Insight::new(InsightType::H2hFlip, Importance::Low);
        assert_eq!(plain.score(), 30);
        let wall = Insight::new(InsightType::DefensiveWall, Importance::High).ranked(Some(2));
        assert_eq!(wall.score(), 80 + 15 + 20);
        let fourth = Insight::new(InsightType::HighScoring, Importance::Medium).ranked(Some(4));
        assert_eq!(fourth.score(), 85);
        let streak = Insight::new(InsightType::WinningStreak, Importance::Medium).value(5.0);
        assert_eq!(streak.score(), 75 + 5 + 10);
        let short = Insight::new(InsightType::WinningStreak, Importance::Medium).value(4.0);
        assert_eq!(short.score(), 80);
    }

    #[test]
    fn top_by_score_is_stable() {
        let mut report = MatchupReport::new("A", "B");
        report.push(Insight::new(InsightType::SeasonHalves, Importance::High).for_team("A"));
        report.push(Insight::new(InsightType::HotHand, Importance::Low).for_team("B"));
        report.push(Insight::new(InsightType::HotHand, Importance::Low).for_team("A"));
        let top = report.top_by_score(2);
        assert_eq!(top[0].kind, InsightType::HotHand);
        assert_eq!(top[0].team.as_deref(), Some("B"));
        assert_eq!(top[1].team.as_deref(), Some("A"));
    }

    #[test]
    fn conflicts_need_both_teams_near_the_top() {
        let mut report = MatchupReport::new("A", "B");
        report.push(Insight::new(InsightType::DefensiveWall, Importance::High).for_team("A").ranked(Some(1)));
        report.push(Insight::new(InsightType::DefensiveWall, Importance::High).for_team("B").ranked(Some(6)));
        report.push(Insight::new(InsightType::HighScoring, Importance::Medium).for_team("A").ranked(Some(2)));
        report.push(Insight::new(InsightType::HighScoring, Importance::Medium).for_team("B").ranked(Some(5)));
        report.push(Insight::new(InsightType::WinningStreak, Importance::High).for_team("A").value(4.0));
        report.push(Insight::new(InsightType::WinningStreak, Importance::High).for_team("B").value(6.0));
        report.push(Insight::new(InsightType::BlowoutWins, Importance::Medium).for_team("A").value(3.0));

        let conflicts = report.conflicts();
        let kinds: Vec<ConflictKind> = conflicts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ConflictKind::Shootout, ConflictKind::BothOnStreaks]);
        assert_eq!(conflicts[0].text, "Shootout: #2 offense against #5");
        assert_eq!(conflicts[1].text, "Both in form: A has won 4 straight, B 6");
    }
}
