use crate::opcodes::client as op;
use crate::reader::{DecodeResult, Heading, Reader};
use realm_shared::error::ProtocolError;

pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_PASSWORD_LEN: usize = 64;
pub const MAX_CHAT_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 30;

/// A fully decoded, field-validated client command (`spec.md` §4.2).
/// Every variant's fields already satisfy the validation catalog; a
/// handler never needs to re-check slot/coordinate/heading/quantity
/// bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Login { username: String, password: String },
    Logout,
    Walk { heading: Heading },
    Attack,
    Pickup,
    Drop { slot: u8, quantity: u16 },
    Talk { text: String },
    Whisper { target: String, text: String },
    UseItem { slot: u8 },
    EquipItem { slot: u8 },
    CastSpell { spell_slot: u8, x: u8, y: u8 },
    Meditate { enable: bool },
    CommerceStart,
    CommerceBuy { slot: u8, quantity: u16 },
    CommerceSell { slot: u8, quantity: u16 },
    CommerceEnd,
    BankDeposit { slot: u8, quantity: u16 },
    BankExtract { slot: u8, quantity: u16 },
    PartyCreate,
    PartyInvite { target: String },
    PartyLeave,
    ClanCreate { name: String },
    ClanInvite { target: String },
    ClanLeave,
    ClanChat { text: String },
    PartyChat { text: String },
}

impl ClientCommand {
    /// Decodes one command from `opcode` + the bytes following it in
    /// `reader`. Returns `Err` for any out-of-range field or an unknown
    /// opcode, per the total-decoding contract in §4.2.
    pub fn decode(opcode: u8, reader: &mut Reader) -> DecodeResult<ClientCommand> {
        Ok(match opcode {
            op::LOGIN => ClientCommand::Login {
                username: reader.read_string(MAX_USERNAME_LEN)?,
                password: reader.read_string(MAX_PASSWORD_LEN)?,
            },
            op::LOGOUT => ClientCommand::Logout,
            op::WALK => ClientCommand::Walk {
                heading: reader.read_heading()?,
            },
            op::ATTACK => ClientCommand::Attack,
            op::PICKUP => ClientCommand::Pickup,
            op::DROP => ClientCommand::Drop {
                slot: reader.read_inventory_slot()?,
                quantity: reader.read_quantity()?,
            },
            op::TALK => ClientCommand::Talk {
                text: reader.read_string(MAX_CHAT_LEN)?,
            },
            op::WHISPER => ClientCommand::Whisper {
                target: reader.read_string(MAX_USERNAME_LEN)?,
                text: reader.read_string(MAX_CHAT_LEN)?,
            },
            op::USE_ITEM => ClientCommand::UseItem {
                slot: reader.read_inventory_slot()?,
            },
            op::EQUIP_ITEM => ClientCommand::EquipItem {
                slot: reader.read_inventory_slot()?,
            },
            op::CAST_SPELL => ClientCommand::CastSpell {
                spell_slot: reader.read_spellbook_slot()?,
                x: reader.read_coordinate()?,
                y: reader.read_coordinate()?,
            },
            op::MEDITATE => ClientCommand::Meditate {
                enable: reader.read_u8()? != 0,
            },
            op::COMMERCE_START => ClientCommand::CommerceStart,
            op::COMMERCE_BUY => ClientCommand::CommerceBuy {
                slot: reader.read_inventory_slot()?,
                quantity: reader.read_quantity()?,
            },
            op::COMMERCE_SELL => ClientCommand::CommerceSell {
                slot: reader.read_inventory_slot()?,
                quantity: reader.read_quantity()?,
            },
            op::COMMERCE_END => ClientCommand::CommerceEnd,
            op::BANK_DEPOSIT => ClientCommand::BankDeposit {
                slot: reader.read_inventory_slot()?,
                quantity: reader.read_quantity()?,
            },
            op::BANK_EXTRACT => ClientCommand::BankExtract {
                slot: reader.read_inventory_slot()?,
                quantity: reader.read_quantity()?,
            },
            op::PARTY_CREATE => ClientCommand::PartyCreate,
            op::PARTY_INVITE => ClientCommand::PartyInvite {
                target: reader.read_string(MAX_USERNAME_LEN)?,
            },
            op::PARTY_LEAVE => ClientCommand::PartyLeave,
            op::CLAN_CREATE => ClientCommand::ClanCreate {
                name: reader.read_string(MAX_NAME_LEN)?,
            },
            op::CLAN_INVITE => ClientCommand::ClanInvite {
                target: reader.read_string(MAX_USERNAME_LEN)?,
            },
            op::CLAN_LEAVE => ClientCommand::ClanLeave,
            op::CLAN_CHAT => ClientCommand::ClanChat {
                text: reader.read_string(MAX_CHAT_LEN)?,
            },
            op::PARTY_CHAT => ClientCommand::PartyChat {
                text: reader.read_string(MAX_CHAT_LEN)?,
            },
            other => return Err(ProtocolError::UnknownOpcode(other).into()),
        })
    }

    /// Whether this command may run before `LOGIN` succeeds.
    pub fn requires_no_auth(&self) -> bool {
        matches!(self, ClientCommand::Login { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    fn encode_login(username: &str, password: &str) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_string(username);
        w.write_string(password);
        w.into_bytes()
    }

    #[test]
    fn decodes_login() {
        let bytes = encode_login("alice", "password123");
        let mut r = Reader::new(&bytes);
        let cmd = ClientCommand::decode(op::LOGIN, &mut r).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Login {
                username: "alice".to_string(),
                password: "password123".to_string()
            }
        );
        assert_eq!(r.consumed(), bytes.len());
    }

    #[test]
    fn unknown_opcode_rejected() {
        let bytes = vec![];
        let mut r = Reader::new(&bytes);
        assert!(ClientCommand::decode(250, &mut r).is_err());
    }

    #[test]
    fn walk_decodes_heading_and_rejects_bad_values() {
        let mut r = Reader::new(&[3]);
        assert_eq!(
            ClientCommand::decode(op::WALK, &mut r).unwrap(),
            ClientCommand::Walk { heading: Heading::South }
        );
        let mut r = Reader::new(&[9]);
        assert!(ClientCommand::decode(op::WALK, &mut r).is_err());
    }
}
