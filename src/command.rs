//! Builders for the world commands the engine issues.

use crate::space::Placement;
use glam::DVec3;
use serde::Serialize;

/// Severity tag of a broadcast line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "§b INFO: ",
            Level::Error => "§c ERROR: ",
        }
    }
}

#[derive(Serialize)]
struct RawTextItem<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct RawText<'a> {
    rawtext: Vec<RawTextItem<'a>>,
}

/// Voxel coordinate of a continuous position.
pub fn voxel(position: DVec3) -> [i64; 3] {
    let r = position.round();
    [r.x as i64, r.y as i64, r.z as i64]
}

/// `setblock` for one placement, snapped to the nearest voxel.
pub fn setblock(placement: &Placement) -> String {
    let [x, y, z] = voxel(placement.position);
    format!(
        "setblock {x} {y} {z} {} {}",
        placement.material.name, placement.material.data
    )
}

/// Toggles per-command output so probe results carry their parameters.
pub fn command_feedback(enabled: bool) -> String {
    format!("gamerule sendcommandfeedback {enabled}")
}

/// Asks the world to test the block under `target`; the result echoes its position.
pub fn probe(target: &str) -> String {
    format!("execute {target} ~ ~ ~ testforblock ~ ~ ~ air")
}

pub fn actionbar(target: &str, text: &str) -> String {
    format!("title {target} actionbar {text}")
}

/// A `tellraw` line for every entry of `lines`, prefixed with the local time and level.
pub fn tellraw<S: AsRef<str>>(target: &str, level: Level, lines: &[S]) -> String {
    let prefix = format!(
        "§6[{}]{}",
        chrono::Local::now().format("%H:%M:%S"),
        level.tag()
    );
    let texts: Vec<String> = lines
        .iter()
        .map(|line| format!("{prefix} {}", line.as_ref()))
        .collect();
    let payload = RawText {
        rawtext: texts.iter().map(|text| RawTextItem { text }).collect(),
    };
    let json = serde_json::to_string(&payload).unwrap_or_else(|_| "{\"rawtext\":[]}".to_string());
    format!("tellraw {target} {json}")
}
