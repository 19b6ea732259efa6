use serde::Serialize;

struct LevelDef {
    level: u32,
    title: &'static str,
    min_points: i64,
}

const LEVELS: &[LevelDef] = &[
    LevelDef { level: 1, title: "Sonhador", min_points: 0 },
    LevelDef { level: 2, title: "Planejador", min_points: 100 },
    LevelDef { level: 3, title: "Explorador", min_points: 300 },
    LevelDef { level: 4, title: "Estrategista", min_points: 600 },
    LevelDef { level: 5, title: "Desbravador", min_points: 1_000 },
    LevelDef { level: 6, title: "Pioneiro", min_points: 1_500 },
    LevelDef { level: 7, title: "Conquistador", min_points: 2_500 },
    LevelDef { level: 8, title: "Embaixador", min_points: 4_000 },
    LevelDef { level: 9, title: "Cidadão Global", min_points: 6_000 },
    LevelDef { level: 10, title: "Lenda Americana", min_points: 10_000 },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub title: &'static str,
    pub min_points: i64,
    pub next_level_points: Option<i64>,
    pub points_to_next: Option<i64>,
    /// Progress through the current level, in 0..=100. Always 100 at the top level.
    pub progress_pct: u32,
}

pub fn level_for(points: i64) -> LevelInfo {
    let points = points.max(0);
    let idx = LEVELS
        .iter()
        .rposition(|l| points >= l.min_points)
        .unwrap_or(0);
    let current = &LEVELS[idx];
    let next = LEVELS.get(idx + 1);

    let progress_pct = match next {
        Some(next) => {
            let span = (next.min_points - current.min_points) as f64;
            (((points - current.min_points) as f64 / span) * 100.0).floor() as u32
        }
        None => 100,
    };

    LevelInfo {
        level: current.level,
        title: current.title,
        min_points: current.min_points,
        next_level_points: next.map(|n| n.min_points),
        points_to_next: next.map(|n| n.min_points - points),
        progress_pct: progress_pct.min(100),
    }
}

#[cfg(test)]
pub fn max_level() -> u32 {
    LEVELS.last().map(|l| l.level).unwrap_or(1)
}
