use serde::Serialize;
use serde_json::Value;

use super::command::CommandList;

/// 1-indexed record collection. Slot 0 is always `None`, as is every slot
/// whose raw entry was empty or unreadable.
pub type Collection<T> = Vec<Option<T>>;

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub nickname: String,
    pub profile: String,
    pub note: String,
    pub battler_name: String,
    pub character_index: i64,
    pub character_name: String,
    pub class_id: i64,
    pub equips: Vec<i64>,
    pub face_index: i64,
    pub face_name: String,
    pub traits: Vec<Value>,
    pub initial_level: i64,
    pub max_level: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub note: String,
    pub icon_index: i64,
    pub itype_id: i64,
    pub price: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub message1: String,
    pub message2: String,
    pub note: String,
    pub message_type: i64,
    pub mp_cost: i64,
    pub required_wtype_id1: i64,
    pub required_wtype_id2: i64,
    pub stype_id: i64,
    pub tp_cost: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Enemy {
    pub id: i64,
    pub name: String,
    pub note: String,
    pub actions: Vec<Value>,
    pub battler_hue: i64,
    pub battler_name: String,
    pub drop_items: Vec<Value>,
    pub exp: i64,
    pub traits: Vec<Value>,
    pub gold: i64,
    pub params: Vec<i64>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct CommonEvent {
    pub id: i64,
    pub name: String,
    pub switch_id: i64,
    /// 0: none, 1: autorun, 2: parallel
    pub trigger: i64,
    pub list: CommandList,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct TroopMember {
    pub enemy_id: i64,
    pub x: i64,
    pub y: i64,
    pub hidden: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct BattleConditions {
    pub actor_hp: i64,
    pub actor_id: i64,
    pub actor_valid: bool,
    pub enemy_hp: i64,
    pub enemy_index: i64,
    pub enemy_valid: bool,
    pub switch_id: i64,
    pub switch_valid: bool,
    pub turn_a: i64,
    pub turn_b: i64,
    pub turn_ending: bool,
    pub turn_valid: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct TroopPage {
    pub conditions: BattleConditions,
    pub list: CommandList,
    pub span: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Troop {
    pub id: i64,
    pub name: String,
    pub members: Vec<TroopMember>,
    pub pages: Vec<TroopPage>,
}
