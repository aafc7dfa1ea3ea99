use serde_json::Value;
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::model::command::Command;
use crate::model::database::{
    Actor, BattleConditions, Collection, CommonEvent, Enemy, Item, Skill, Troop, TroopMember,
    TroopPage,
};
use crate::model::map::{
    AudioCue, AutonomousMovement, EventConditions, EventImage, EventOptions, EventPage, MapData,
    MapEvent, MoveRoute,
};
use crate::model::system::{SystemData, SystemTerms, TermSlot};

use super::coerce::{
    array, field, flag, int, int_default, ints, object, string_slot, text, truthy, values,
};

/// Failure of a single record; the collection keeps going without it.
pub type RecordResult<T> = Result<T, String>;

pub fn parse_json(input: &str, file: &str) -> CoreResult<Value> {
    serde_json::from_str(input).map_err(|e| CoreError::json(file, e))
}

fn require_object(raw: &Value, what: &str) -> RecordResult<()> {
    if raw.is_object() {
        Ok(())
    } else {
        Err(format!("invalid {what} data: expected an object"))
    }
}

/// Parses a 1-indexed record array. Slot 0 and falsy slots become `None`;
/// a record that fails to parse is logged and becomes `None` too.
pub fn parse_collection<T>(
    raw: &Value,
    file: &str,
    kind: &str,
    parse_one: fn(&Value) -> RecordResult<T>,
) -> CoreResult<Collection<T>> {
    let items = raw
        .as_array()
        .ok_or_else(|| CoreError::shape(file, format!("invalid {kind} data: expected an array")))?;

    let parsed = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == 0 || !truthy(Some(item)) {
                return None;
            }
            match parse_one(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(file, index, "skipping {kind}: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(parsed)
}

pub fn parse_command(raw: &Value) -> Command {
    Command {
        code: int(raw, "code"),
        indent: int(raw, "indent"),
        parameters: values(raw, "parameters"),
    }
}

fn parse_command_list(raw: &Value) -> Vec<Command> {
    array(raw, "list").iter().map(parse_command).collect()
}

fn parse_audio(raw: &Value) -> AudioCue {
    AudioCue {
        name: text(raw, "name"),
        pan: int(raw, "pan"),
        pitch: int_default(raw, "pitch", 100),
        volume: int_default(raw, "volume", 90),
    }
}

fn parse_conditions(raw: &Value) -> EventConditions {
    EventConditions {
        actor_id: int(raw, "actorId"),
        actor_valid: flag(raw, "actorValid"),
        item_id: int(raw, "itemId"),
        item_valid: flag(raw, "itemValid"),
        self_switch_ch: text(raw, "selfSwitchCh"),
        self_switch_valid: flag(raw, "selfSwitchValid"),
        switch1_id: int(raw, "switch1Id"),
        switch1_valid: flag(raw, "switch1Valid"),
        switch2_id: int(raw, "switch2Id"),
        switch2_valid: flag(raw, "switch2Valid"),
        variable_id: int(raw, "variableId"),
        variable_valid: flag(raw, "variableValid"),
        variable_value: int(raw, "variableValue"),
    }
}

fn parse_image(raw: &Value) -> EventImage {
    EventImage {
        character_name: text(raw, "characterName"),
        character_index: int(raw, "characterIndex"),
        direction: int(raw, "direction"),
        pattern: int(raw, "pattern"),
        tile_id: int(raw, "tileId"),
    }
}

fn parse_move_route(raw: &Value) -> MoveRoute {
    MoveRoute {
        list: array(raw, "list")
            .iter()
            .map(|c| Command::new(int(c, "code"), 0, values(c, "parameters")))
            .collect(),
        repeat: flag(raw, "repeat"),
        skippable: flag(raw, "skippable"),
        wait: flag(raw, "wait"),
    }
}

pub fn parse_event_page(raw: &Value) -> RecordResult<EventPage> {
    require_object(raw, "event page")?;

    Ok(EventPage {
        conditions: parse_conditions(object(raw, "conditions")),
        movement: AutonomousMovement {
            move_type: int(raw, "moveType"),
            move_route: parse_move_route(object(raw, "moveRoute")),
            move_speed: int(raw, "moveSpeed"),
            move_frequency: int(raw, "moveFrequency"),
        },
        image: parse_image(object(raw, "image")),
        list: parse_command_list(raw),
        options: EventOptions {
            walk_anime: flag(raw, "walkAnime"),
            step_anime: flag(raw, "stepAnime"),
            direction_fix: flag(raw, "directionFix"),
            through: flag(raw, "through"),
        },
        priority_type: int(raw, "priorityType"),
        trigger: int(raw, "trigger"),
    })
}

pub fn parse_event(raw: &Value) -> RecordResult<MapEvent> {
    require_object(raw, "event")?;

    let id = int(raw, "id");
    let pages = array(raw, "pages")
        .iter()
        .enumerate()
        .map(|(index, page)| {
            if !truthy(Some(page)) {
                return None;
            }
            parse_event_page(page)
                .map_err(|e| warn!(event = id, page = index, "skipping page: {e}"))
                .ok()
        })
        .collect();

    Ok(MapEvent {
        id,
        name: text(raw, "name"),
        note: text(raw, "note"),
        pages,
        x: int(raw, "x"),
        y: int(raw, "y"),
    })
}

pub fn parse_map(raw: &Value, file: &str) -> CoreResult<MapData> {
    if !raw.is_object() {
        return Err(CoreError::shape(file, "invalid map data: expected an object"));
    }

    let events = array(raw, "events")
        .iter()
        .enumerate()
        .map(|(index, event)| {
            if !truthy(Some(event)) {
                return None;
            }
            match parse_event(event) {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!(file, index, "skipping event: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(MapData {
        autoplay_bgm: flag(raw, "autoplayBgm"),
        autoplay_bgs: flag(raw, "autoplayBgs"),
        battleback1_name: text(raw, "battleback1Name"),
        battleback2_name: text(raw, "battleback2Name"),
        bgm: parse_audio(object(raw, "bgm")),
        bgs: parse_audio(object(raw, "bgs")),
        disable_dashing: flag(raw, "disableDashing"),
        display_name: text(raw, "displayName"),
        encounter_list: ints(raw, "encounterList"),
        encounter_step: int_default(raw, "encounterStep", 30),
        height: int(raw, "height"),
        note: text(raw, "note"),
        parallax_loop_x: flag(raw, "parallaxLoopX"),
        parallax_loop_y: flag(raw, "parallaxLoopY"),
        parallax_name: text(raw, "parallaxName"),
        parallax_show: flag(raw, "parallaxShow"),
        parallax_sx: int(raw, "parallaxSx"),
        parallax_sy: int(raw, "parallaxSy"),
        scroll_type: int(raw, "scrollType"),
        specify_battleback: flag(raw, "specifyBattleback"),
        tileset_id: int(raw, "tilesetId"),
        width: int(raw, "width"),
        events,
    })
}

pub fn parse_common_event(raw: &Value) -> RecordResult<CommonEvent> {
    require_object(raw, "common event")?;

    Ok(CommonEvent {
        id: int(raw, "id"),
        name: text(raw, "name"),
        switch_id: int(raw, "switchId"),
        trigger: int(raw, "trigger"),
        list: parse_command_list(raw),
    })
}

fn parse_battle_conditions(raw: &Value) -> BattleConditions {
    BattleConditions {
        actor_hp: int_default(raw, "actorHp", 50),
        actor_id: int_default(raw, "actorId", 1),
        actor_valid: flag(raw, "actorValid"),
        enemy_hp: int_default(raw, "enemyHp", 50),
        enemy_index: int(raw, "enemyIndex"),
        enemy_valid: flag(raw, "enemyValid"),
        switch_id: int_default(raw, "switchId", 1),
        switch_valid: flag(raw, "switchValid"),
        turn_a: int(raw, "turnA"),
        turn_b: int(raw, "turnB"),
        turn_ending: flag(raw, "turnEnding"),
        turn_valid: flag(raw, "turnValid"),
    }
}

pub fn parse_troop(raw: &Value) -> RecordResult<Troop> {
    require_object(raw, "troop")?;

    Ok(Troop {
        id: int(raw, "id"),
        name: text(raw, "name"),
        members: array(raw, "members")
            .iter()
            .map(|m| TroopMember {
                enemy_id: int(m, "enemyId"),
                x: int(m, "x"),
                y: int(m, "y"),
                hidden: flag(m, "hidden"),
            })
            .collect(),
        pages: array(raw, "pages")
            .iter()
            .map(|p| TroopPage {
                conditions: parse_battle_conditions(object(p, "conditions")),
                list: parse_command_list(p),
                span: int(p, "span"),
            })
            .collect(),
    })
}

pub fn parse_actor(raw: &Value) -> RecordResult<Actor> {
    require_object(raw, "actor")?;

    Ok(Actor {
        id: int(raw, "id"),
        name: text(raw, "name"),
        nickname: text(raw, "nickname"),
        profile: text(raw, "profile"),
        note: text(raw, "note"),
        battler_name: text(raw, "battlerName"),
        character_index: int(raw, "characterIndex"),
        character_name: text(raw, "characterName"),
        class_id: int_default(raw, "classId", 1),
        equips: ints(raw, "equips"),
        face_index: int(raw, "faceIndex"),
        face_name: text(raw, "faceName"),
        traits: values(raw, "traits"),
        initial_level: int_default(raw, "initialLevel", 1),
        max_level: int_default(raw, "maxLevel", 99),
    })
}

pub fn parse_item(raw: &Value) -> RecordResult<Item> {
    require_object(raw, "item")?;

    Ok(Item {
        id: int(raw, "id"),
        name: text(raw, "name"),
        description: text(raw, "description"),
        note: text(raw, "note"),
        icon_index: int(raw, "iconIndex"),
        itype_id: int_default(raw, "itypeId", 1),
        price: int(raw, "price"),
    })
}

pub fn parse_skill(raw: &Value) -> RecordResult<Skill> {
    require_object(raw, "skill")?;

    Ok(Skill {
        id: int(raw, "id"),
        name: text(raw, "name"),
        message1: text(raw, "message1"),
        message2: text(raw, "message2"),
        note: text(raw, "note"),
        message_type: int(raw, "messageType"),
        mp_cost: int(raw, "mpCost"),
        required_wtype_id1: int(raw, "requiredWtypeId1"),
        required_wtype_id2: int(raw, "requiredWtypeId2"),
        stype_id: int(raw, "stypeId"),
        tp_cost: int(raw, "tpCost"),
    })
}

pub fn parse_enemy(raw: &Value) -> RecordResult<Enemy> {
    require_object(raw, "enemy")?;

    Ok(Enemy {
        id: int(raw, "id"),
        name: text(raw, "name"),
        note: text(raw, "note"),
        actions: values(raw, "actions"),
        battler_hue: int(raw, "battlerHue"),
        battler_name: text(raw, "battlerName"),
        drop_items: values(raw, "dropItems"),
        exp: int(raw, "exp"),
        traits: values(raw, "traits"),
        gold: int(raw, "gold"),
        params: ints(raw, "params"),
    })
}

fn slots(raw: &Value, key: &str) -> Vec<TermSlot> {
    array(raw, key).iter().map(|v| string_slot(Some(v))).collect()
}

pub fn parse_system(raw: &Value, file: &str) -> CoreResult<SystemData> {
    if !raw.is_object() {
        return Err(CoreError::shape(file, "invalid system data: expected an object"));
    }

    let terms = object(raw, "terms");
    let messages = object(terms, "messages")
        .as_object()
        .map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), string_slot(Some(v))))
                .collect()
        })
        .unwrap_or_default();

    Ok(SystemData {
        game_title: string_slot(field(raw, "gameTitle")),
        currency_unit: string_slot(field(raw, "currencyUnit")),
        armor_types: slots(raw, "armorTypes"),
        equip_types: slots(raw, "equipTypes"),
        weapon_types: slots(raw, "weaponTypes"),
        elements: slots(raw, "elements"),
        skill_types: slots(raw, "skillTypes"),
        switches: slots(raw, "switches"),
        variables: slots(raw, "variables"),
        terms: SystemTerms {
            basic: slots(terms, "basic"),
            commands: slots(terms, "commands"),
            params: slots(terms, "params"),
            messages,
        },
    })
}

/// Reads the trailing number of a `MapNNN.json` file name.
pub fn map_id_from_file_name(name: &str) -> Option<u32> {
    let stem = name.strip_prefix("Map")?.strip_suffix(".json")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_keeps_sentinel_and_degrades_bad_records() {
        let raw = json!([
            null,
            { "id": 1, "name": "Potion" },
            0,
            "garbage",
            { "id": 4, "name": "Ether", "price": "25" }
        ]);

        let items = parse_collection(&raw, "Items.json", "item", parse_item).unwrap();

        assert_eq!(items.len(), 5);
        assert!(items[0].is_none());
        assert_eq!(items[1].as_ref().unwrap().name, "Potion");
        assert_eq!(items[1].as_ref().unwrap().itype_id, 1);
        assert!(items[2].is_none());
        assert!(items[3].is_none());
        assert_eq!(items[4].as_ref().unwrap().price, 25);
    }

    #[test]
    fn non_array_root_is_a_shape_error() {
        let raw = json!({ "id": 1 });
        let err = parse_collection(&raw, "Actors.json", "actor", parse_actor).unwrap_err();
        assert!(matches!(err, CoreError::Shape { .. }));
    }

    #[test]
    fn event_page_synthesizes_missing_sub_objects() {
        let raw = json!({
            "list": [ { "code": 401, "indent": 0, "parameters": ["hi"] } ],
            "trigger": 3
        });

        let page = parse_event_page(&raw).unwrap();

        assert_eq!(page.trigger, 3);
        assert_eq!(page.list.len(), 1);
        assert_eq!(page.list[0].code, 401);
        assert_eq!(page.conditions, EventConditions::default());
        assert!(page.movement.move_route.list.is_empty());
        assert_eq!(page.image.character_name, "");
    }

    #[test]
    fn map_events_and_pages_keep_their_indices() {
        let raw = json!({
            "displayName": "Town",
            "events": [
                null,
                { "id": 1, "name": "Guard", "pages": [ null, { "list": [] } ] },
                7
            ]
        });

        let map = parse_map(&raw, "Map001.json").unwrap();

        assert_eq!(map.display_name, "Town");
        assert_eq!(map.encounter_step, 30);
        assert_eq!(map.bgm.volume, 90);
        assert_eq!(map.events.len(), 3);
        let guard = map.events[1].as_ref().unwrap();
        assert!(guard.pages[0].is_none());
        assert!(guard.pages[1].is_some());
        assert!(map.events[2].is_none());
    }

    #[test]
    fn system_term_slots_keep_non_strings_as_none() {
        let raw = json!({
            "gameTitle": "勇者",
            "elements": ["", "炎"],
            "terms": {
                "commands": ["戦う", null],
                "messages": { "victory": "%1の勝利！", "count": 3 }
            }
        });

        let sys = parse_system(&raw, "System.json").unwrap();

        assert_eq!(sys.game_title.as_deref(), Some("勇者"));
        assert_eq!(sys.elements, vec![Some(String::new()), Some("炎".to_string())]);
        assert_eq!(sys.terms.commands, vec![Some("戦う".to_string()), None]);
        assert_eq!(sys.terms.messages[0].0, "victory");
        assert_eq!(sys.terms.messages[1].1, None);
        assert!(sys.terms.basic.is_empty());
    }

    #[test]
    fn map_file_names() {
        assert_eq!(map_id_from_file_name("Map012.json"), Some(12));
        assert_eq!(map_id_from_file_name("MapInfos.json"), None);
        assert_eq!(map_id_from_file_name("Map.json"), None);
    }
}
