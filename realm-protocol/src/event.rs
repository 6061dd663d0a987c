use crate::opcodes::{multi_message as mm, server as op};
use crate::writer::Writer;

/// A bit-exact server→client event (`spec.md` §4.2, §6's event list).
/// Each variant knows how to encode itself; this is the "Message
/// Builders" component.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ChangeMap { map: u16 },
    PosUpdate { x: u8, y: u8 },
    CharacterCreate { char_index: u32, x: u8, y: u8, heading: u8, name: String },
    CharacterMove { char_index: u32, x: u8, y: u8, heading: u8 },
    CharacterRemove { char_index: u32 },
    UpdateUserStats { hp: i32, max_hp: i32, mana: i32, max_mana: i32, stamina: i32, max_stamina: i32 },
    UpdateHungerAndThirst { hunger: u8, max_hunger: u8, thirst: u8, max_thirst: u8 },
    UpdateGold { gold: u32 },
    ChangeInventorySlot { slot: u8, item_id: u16, quantity: u16 },
    Logged,
    UserCharIndexInServer { char_index: u32 },
    BlockPosition,
    PlayWave { wave_id: u16, x: u8, y: u8 },
    CreateFx { char_index: u32, fx_id: u16 },
    CommerceInit,
    CommerceEnd,
    ObjectCreate { x: u8, y: u8, item_id: u16 },
    ObjectRemove { x: u8, y: u8 },
    ClanDetails { name: String, member_count: u16 },
    /// §9 Open Question: whichever opcode `console_or_error` names.
    ConsoleOrErrorMsg { opcode: u8, text: String },
    MultiMessage(MultiMessage),
}

/// `spec.md` GLOSSARY: a family of short notifications multiplexed
/// behind [`crate::opcodes::server::MULTI_MESSAGE`] and indexed by a
/// sub-opcode byte.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiMessage {
    NpcHitUser { char_index: u32, damage: i32 },
    UserHitNpc { char_index: u32, damage: i32 },
    UserHitUser { char_index: u32, damage: i32 },
    NpcKilled { char_index: u32 },
    UserKilled { char_index: u32 },
    WorkRequestTarget,
    LevelUp { new_level: u16 },
}

impl ServerEvent {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ServerEvent::ChangeMap { map } => Writer::with_opcode(op::CHANGE_MAP).write_u16(*map).into_bytes(),
            ServerEvent::PosUpdate { x, y } => {
                Writer::with_opcode(op::POS_UPDATE).write_u8(*x).write_u8(*y).into_bytes()
            }
            ServerEvent::CharacterCreate { char_index, x, y, heading, name } => {
                Writer::with_opcode(op::CHARACTER_CREATE)
                    .write_u32(*char_index)
                    .write_u8(*x)
                    .write_u8(*y)
                    .write_u8(*heading)
                    .write_string(name)
                    .into_bytes()
            }
            ServerEvent::CharacterMove { char_index, x, y, heading } => {
                Writer::with_opcode(op::CHARACTER_MOVE)
                    .write_u32(*char_index)
                    .write_u8(*x)
                    .write_u8(*y)
                    .write_u8(*heading)
                    .into_bytes()
            }
            ServerEvent::CharacterRemove { char_index } => {
                Writer::with_opcode(op::CHARACTER_REMOVE).write_u32(*char_index).into_bytes()
            }
            ServerEvent::UpdateUserStats { hp, max_hp, mana, max_mana, stamina, max_stamina } => {
                Writer::with_opcode(op::UPDATE_USER_STATS)
                    .write_i32(*hp)
                    .write_i32(*max_hp)
                    .write_i32(*mana)
                    .write_i32(*max_mana)
                    .write_i32(*stamina)
                    .write_i32(*max_stamina)
                    .into_bytes()
            }
            ServerEvent::UpdateHungerAndThirst { hunger, max_hunger, thirst, max_thirst } => {
                Writer::with_opcode(op::UPDATE_HUNGER_AND_THIRST)
                    .write_u8(*hunger)
                    .write_u8(*max_hunger)
                    .write_u8(*thirst)
                    .write_u8(*max_thirst)
                    .into_bytes()
            }
            ServerEvent::UpdateGold { gold } => Writer::with_opcode(op::UPDATE_GOLD).write_u32(*gold).into_bytes(),
            ServerEvent::ChangeInventorySlot { slot, item_id, quantity } => {
                Writer::with_opcode(op::CHANGE_INVENTORY_SLOT)
                    .write_u8(*slot)
                    .write_u16(*item_id)
                    .write_u16(*quantity)
                    .into_bytes()
            }
            ServerEvent::Logged => Writer::with_opcode(op::LOGGED).into_bytes(),
            ServerEvent::UserCharIndexInServer { char_index } => {
                Writer::with_opcode(op::USER_CHAR_INDEX_IN_SERVER).write_u32(*char_index).into_bytes()
            }
            ServerEvent::BlockPosition => Writer::with_opcode(op::BLOCK_POSITION).into_bytes(),
            ServerEvent::PlayWave { wave_id, x, y } => {
                Writer::with_opcode(op::PLAY_WAVE).write_u16(*wave_id).write_u8(*x).write_u8(*y).into_bytes()
            }
            ServerEvent::CreateFx { char_index, fx_id } => {
                Writer::with_opcode(op::CREATE_FX).write_u32(*char_index).write_u16(*fx_id).into_bytes()
            }
            ServerEvent::CommerceInit => Writer::with_opcode(op::COMMERCE_INIT).into_bytes(),
            ServerEvent::CommerceEnd => Writer::with_opcode(op::COMMERCE_END).into_bytes(),
            ServerEvent::ObjectCreate { x, y, item_id } => {
                Writer::with_opcode(op::OBJECT_CREATE).write_u8(*x).write_u8(*y).write_u16(*item_id).into_bytes()
            }
            ServerEvent::ObjectRemove { x, y } => {
                Writer::with_opcode(op::OBJECT_REMOVE).write_u8(*x).write_u8(*y).into_bytes()
            }
            ServerEvent::ClanDetails { name, member_count } => {
                Writer::with_opcode(op::CLAN_DETAILS).write_string(name).write_u16(*member_count).into_bytes()
            }
            ServerEvent::ConsoleOrErrorMsg { opcode, text } => {
                Writer::with_opcode(*opcode).write_string(text).into_bytes()
            }
            ServerEvent::MultiMessage(msg) => msg.encode(),
        }
    }

    /// `spec.md` §9 Open Question: routes through `CONSOLE_MSG` (24) or
    /// `ERROR_MSG` (55) depending on deployment configuration, rather
    /// than baking in the legacy-client workaround permanently.
    pub fn console_or_error(text: impl Into<String>, use_console_msg: bool) -> ServerEvent {
        ServerEvent::ConsoleOrErrorMsg {
            opcode: if use_console_msg { op::CONSOLE_MSG } else { op::ERROR_MSG },
            text: text.into(),
        }
    }
}

impl MultiMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_opcode(op::MULTI_MESSAGE);
        match self {
            MultiMessage::NpcHitUser { char_index, damage } => {
                w.write_u8(mm::NPC_HIT_USER).write_u32(*char_index).write_i32(*damage);
            }
            MultiMessage::UserHitNpc { char_index, damage } => {
                w.write_u8(mm::USER_HIT_NPC).write_u32(*char_index).write_i32(*damage);
            }
            MultiMessage::UserHitUser { char_index, damage } => {
                w.write_u8(mm::USER_HIT_USER).write_u32(*char_index).write_i32(*damage);
            }
            MultiMessage::NpcKilled { char_index } => {
                w.write_u8(mm::NPC_KILLED).write_u32(*char_index);
            }
            MultiMessage::UserKilled { char_index } => {
                w.write_u8(mm::USER_KILLED).write_u32(*char_index);
            }
            MultiMessage::WorkRequestTarget => {
                w.write_u8(mm::WORK_REQUEST_TARGET);
            }
            MultiMessage::LevelUp { new_level } => {
                w.write_u8(mm::LEVEL_UP).write_u16(*new_level);
            }
        };
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_map_encodes_opcode_and_map_id() {
        let bytes = ServerEvent::ChangeMap { map: 7 }.encode();
        assert_eq!(bytes[0], op::CHANGE_MAP);
        assert_eq!(u16::from_le_bytes([bytes[1], bytes[2]]), 7);
    }

    #[test]
    fn console_or_error_respects_config_flag() {
        let console = ServerEvent::console_or_error("hi", true);
        assert_eq!(console.encode()[0], op::CONSOLE_MSG);
        let error = ServerEvent::console_or_error("hi", false);
        assert_eq!(error.encode()[0], op::ERROR_MSG);
    }

    #[test]
    fn multi_message_nests_sub_opcode() {
        let bytes = MultiMessage::UserHitNpc { char_index: 5, damage: 12 }.encode();
        assert_eq!(bytes[0], op::MULTI_MESSAGE);
        assert_eq!(bytes[1], mm::USER_HIT_NPC);
    }
}
