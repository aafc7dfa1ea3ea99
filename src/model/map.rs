use serde::Serialize;

use super::command::{Command, CommandList};

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct AudioCue {
    pub name: String,
    pub pan: i64,
    pub pitch: i64,
    pub volume: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct EventConditions {
    pub actor_id: i64,
    pub actor_valid: bool,
    pub item_id: i64,
    pub item_valid: bool,
    pub self_switch_ch: String,
    pub self_switch_valid: bool,
    pub switch1_id: i64,
    pub switch1_valid: bool,
    pub switch2_id: i64,
    pub switch2_valid: bool,
    pub variable_id: i64,
    pub variable_valid: bool,
    pub variable_value: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct EventImage {
    pub character_name: String,
    pub character_index: i64,
    pub direction: i64,
    pub pattern: i64,
    pub tile_id: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct MoveRoute {
    /// Move commands carry no indent; it is left at 0.
    pub list: Vec<Command>,
    pub repeat: bool,
    pub skippable: bool,
    pub wait: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct AutonomousMovement {
    pub move_type: i64,
    pub move_route: MoveRoute,
    pub move_speed: i64,
    pub move_frequency: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct EventOptions {
    pub walk_anime: bool,
    pub step_anime: bool,
    pub direction_fix: bool,
    pub through: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct EventPage {
    pub conditions: EventConditions,
    pub movement: AutonomousMovement,
    pub image: EventImage,
    pub list: CommandList,
    pub options: EventOptions,
    pub priority_type: i64,
    pub trigger: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct MapEvent {
    pub id: i64,
    pub name: String,
    pub note: String,
    /// Indexed like the raw `pages` array; unreadable pages are `None`.
    pub pages: Vec<Option<EventPage>>,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct MapData {
    pub autoplay_bgm: bool,
    pub autoplay_bgs: bool,
    pub battleback1_name: String,
    pub battleback2_name: String,
    pub bgm: AudioCue,
    pub bgs: AudioCue,
    pub disable_dashing: bool,
    pub display_name: String,
    pub encounter_list: Vec<i64>,
    pub encounter_step: i64,
    pub height: i64,
    pub note: String,
    pub parallax_loop_x: bool,
    pub parallax_loop_y: bool,
    pub parallax_name: String,
    pub parallax_show: bool,
    pub parallax_sx: i64,
    pub parallax_sy: i64,
    pub scroll_type: i64,
    pub specify_battleback: bool,
    pub tileset_id: i64,
    pub width: i64,
    /// Index 0 is the reserved null slot.
    pub events: Vec<Option<MapEvent>>,
}
