use serde::Serialize;

/// A term table slot. Non-string raw values (the `null`s in `terms.commands`
/// for instance) are kept as `None` so indices still line up with the file.
pub type TermSlot = Option<String>;

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct SystemTerms {
    pub basic: Vec<TermSlot>,
    pub commands: Vec<TermSlot>,
    pub params: Vec<TermSlot>,
    /// `terms.messages` in file order.
    pub messages: Vec<(String, TermSlot)>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct SystemData {
    pub game_title: TermSlot,
    pub currency_unit: TermSlot,
    pub armor_types: Vec<TermSlot>,
    pub equip_types: Vec<TermSlot>,
    pub weapon_types: Vec<TermSlot>,
    pub elements: Vec<TermSlot>,
    pub skill_types: Vec<TermSlot>,
    pub switches: Vec<TermSlot>,
    pub variables: Vec<TermSlot>,
    pub terms: SystemTerms,
}

impl SystemData {
    /// Name lists whose slot 0 is a reserved empty entry, paired with their
    /// JSON key.
    pub fn name_lists(&self) -> [(&'static str, &[TermSlot]); 7] {
        [
            ("armorTypes", &self.armor_types),
            ("equipTypes", &self.equip_types),
            ("weaponTypes", &self.weapon_types),
            ("elements", &self.elements),
            ("skillTypes", &self.skill_types),
            ("switches", &self.switches),
            ("variables", &self.variables),
        ]
    }
}
