//! Quest Event Catalog
//!
//! The closed set of occurrences content scripts can react to. Numeric values
//! are stable: scripts and saved content refer to them, so new kinds are only
//! ever appended after the last entry.

use std::fmt;

/// Error returned when a raw id does not name an event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind id {0}")]
pub struct UnknownEventKind(pub u16);

macro_rules! event_kinds {
    ($($(#[$attr:meta])* $variant:ident = $value:literal => $name:literal,)+) => {
        /// Kinds of quest events, grouped loosely into lifecycle, combat,
        /// social, item, progression, task, timer and control events.
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum EventKind {
            $($(#[$attr])* $variant = $value,)+
        }

        impl EventKind {
            /// Every kind, in numeric order
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant,)+];

            /// Cardinality of the catalog, for array-indexed dispatch tables
            pub const COUNT: usize = Self::ALL.len();

            /// Script-facing name (e.g. "say", "timer_start")
            pub fn name(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(EventKind::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

event_kinds! {
        #[default]
        Say = 0 => "say",
        Trade = 1 => "trade",
        Death = 2 => "death",
        Spawn = 3 => "spawn",
        Attack = 4 => "attack",
        Combat = 5 => "combat",
        Aggro = 6 => "aggro",
        Slay = 7 => "slay",
        NpcSlay = 8 => "npc_slay",
        WaypointArrive = 9 => "waypoint_arrive",
        WaypointDepart = 10 => "waypoint_depart",
        Timer = 11 => "timer",
        Signal = 12 => "signal",
        Hp = 13 => "hp",
        Enter = 14 => "enter",
        Exit = 15 => "exit",
        EnterZone = 16 => "enter_zone",
        ClickDoor = 17 => "click_door",
        Loot = 18 => "loot",
        Zone = 19 => "zone",
        LevelUp = 20 => "level_up",
        KilledMerit = 21 => "killed_merit",
        CastOn = 22 => "cast_on",
        TaskAccepted = 23 => "task_accepted",
        TaskStageComplete = 24 => "task_stage_complete",
        TaskUpdate = 25 => "task_update",
        TaskComplete = 26 => "task_complete",
        TaskFail = 27 => "task_fail",
        AggroSay = 28 => "aggro_say",
        PlayerPickup = 29 => "player_pickup",
        PopupResponse = 30 => "popup_response",
        EnvironmentalDamage = 31 => "environmental_damage",
        ProximitySay = 32 => "proximity_say",
        Cast = 33 => "cast",
        CastBegin = 34 => "cast_begin",
        ScaleCalc = 35 => "scale_calc",
        ItemEnterZone = 36 => "item_enter_zone",
        TargetChange = 37 => "target_change",
        HateList = 38 => "hate_list",
        SpellEffectClient = 39 => "spell_effect_client",
        SpellEffectNpc = 40 => "spell_effect_npc",
        SpellEffectBuffTicClient = 41 => "spell_effect_buff_tic_client",
        SpellEffectBuffTicNpc = 42 => "spell_effect_buff_tic_npc",
        SpellFade = 43 => "spell_fade",
        SpellEffectTranslocateComplete = 44 => "spell_effect_translocate_complete",
        CombineSuccess = 45 => "combine_success",
        CombineFailure = 46 => "combine_failure",
        ItemClick = 47 => "item_click",
        ItemClickCast = 48 => "item_click_cast",
        GroupChange = 49 => "group_change",
        ForageSuccess = 50 => "forage_success",
        ForageFailure = 51 => "forage_failure",
        FishStart = 52 => "fish_start",
        FishSuccess = 53 => "fish_success",
        FishFailure = 54 => "fish_failure",
        ClickObject = 55 => "click_object",
        DiscoverItem = 56 => "discover_item",
        Disconnect = 57 => "disconnect",
        Connect = 58 => "connect",
        ItemTick = 59 => "item_tick",
        DuelWin = 60 => "duel_win",
        DuelLose = 61 => "duel_lose",
        EncounterLoad = 62 => "encounter_load",
        EncounterUnload = 63 => "encounter_unload",
        Command = 64 => "command",
        DropItem = 65 => "drop_item",
        DestroyItem = 66 => "destroy_item",
        FeignDeath = 67 => "feign_death",
        WeaponProc = 68 => "weapon_proc",
        EquipItem = 69 => "equip_item",
        UnequipItem = 70 => "unequip_item",
        AugmentItem = 71 => "augment_item",
        UnaugmentItem = 72 => "unaugment_item",
        AugmentInsert = 73 => "augment_insert",
        AugmentRemove = 74 => "augment_remove",
        EnterArea = 75 => "enter_area",
        LeaveArea = 76 => "leave_area",
        Respawn = 77 => "respawn",
        DeathComplete = 78 => "death_complete",
        UnhandledOpcode = 79 => "unhandled_opcode",
        Tick = 80 => "tick",
        SpawnZone = 81 => "spawn_zone",
        DeathZone = 82 => "death_zone",
        UseSkill = 83 => "use_skill",
        CombineValidate = 84 => "combine_validate",
        BotCommand = 85 => "bot_command",
        Warp = 86 => "warp",
        TestBuff = 87 => "test_buff",
        Combine = 88 => "combine",
        Consider = 89 => "consider",
        ConsiderCorpse = 90 => "consider_corpse",
        LootZone = 91 => "loot_zone",
        EquipItemClient = 92 => "equip_item_client",
        UnequipItemClient = 93 => "unequip_item_client",
        SkillUp = 94 => "skill_up",
        LanguageSkillUp = 95 => "language_skill_up",
        AltCurrencyMerchantBuy = 96 => "alt_currency_merchant_buy",
        AltCurrencyMerchantSell = 97 => "alt_currency_merchant_sell",
        MerchantBuy = 98 => "merchant_buy",
        MerchantSell = 99 => "merchant_sell",
        Inspect = 100 => "inspect",
        TaskBeforeUpdate = 101 => "task_before_update",
        AaBuy = 102 => "aa_buy",
        AaGain = 103 => "aa_gain",
        AaExpGain = 104 => "aa_exp_gain",
        ExpGain = 105 => "exp_gain",
        Payload = 106 => "payload",
        LevelDown = 107 => "level_down",
        GmCommand = 108 => "gm_command",
        Despawn = 109 => "despawn",
        DespawnZone = 110 => "despawn_zone",
        BotCreate = 111 => "bot_create",
        AugmentInsertClient = 112 => "augment_insert_client",
        AugmentRemoveClient = 113 => "augment_remove_client",
        EquipItemBot = 114 => "equip_item_bot",
        UnequipItemBot = 115 => "unequip_item_bot",
        DamageGiven = 116 => "damage_given",
        DamageTaken = 117 => "damage_taken",
        ItemClickClient = 118 => "item_click_client",
        ItemClickCastClient = 119 => "item_click_cast_client",
        DestroyItemClient = 120 => "destroy_item_client",
        DropItemClient = 121 => "drop_item_client",
        MemorizeSpell = 122 => "memorize_spell",
        UnmemorizeSpell = 123 => "unmemorize_spell",
        ScribeSpell = 124 => "scribe_spell",
        UnscribeSpell = 125 => "unscribe_spell",
        LootAdded = 126 => "loot_added",
        LdonPointsGain = 127 => "ldon_points_gain",
        LdonPointsLoss = 128 => "ldon_points_loss",
        AltCurrencyGain = 129 => "alt_currency_gain",
        AltCurrencyLoss = 130 => "alt_currency_loss",
        CrystalGain = 131 => "crystal_gain",
        CrystalLoss = 132 => "crystal_loss",
        TimerPause = 133 => "timer_pause",
        TimerResume = 134 => "timer_resume",
        TimerStart = 135 => "timer_start",
        TimerStop = 136 => "timer_stop",
        EntityVariableDelete = 137 => "entity_variable_delete",
        EntityVariableSet = 138 => "entity_variable_set",
        EntityVariableUpdate = 139 => "entity_variable_update",
        AaLoss = 140 => "aa_loss",
        SpellBlocked = 141 => "spell_blocked",
        ReadItem = 142 => "read_item",
}

impl EventKind {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for EventKind {
    type Error = UnknownEventKind;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        // Ids are contiguous from zero, so the id is the position in ALL
        EventKind::ALL
            .get(value as usize)
            .copied()
            .ok_or(UnknownEventKind(value))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
