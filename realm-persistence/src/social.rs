//! Party and clan persistence (`spec.md` §4.10 "parties", "clans").

use realm_shared::error::HandlerError;

use crate::keys;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct PartyRecord {
    pub party_id: u64,
    pub leader_user_id: u64,
    pub member_user_ids: Vec<u64>,
}

pub fn load_party(store: &Store, party_id: u64) -> Result<Option<PartyRecord>, HandlerError> {
    let key = keys::party(party_id);
    let leader = store.hget(&key, "leader")?;
    let Some(leader) = leader else { return Ok(None) };
    let members = store.smembers(&format!("{key}:members"))?;
    Ok(Some(PartyRecord {
        party_id,
        leader_user_id: leader
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt party leader for {party_id}"))?,
        member_user_ids: members
            .into_iter()
            .map(|m| m.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| anyhow::anyhow!("corrupt party member for {party_id}"))?,
    }))
}

pub fn save_party(store: &Store, party: &PartyRecord) -> Result<(), HandlerError> {
    let key = keys::party(party.party_id);
    store.hset(&key, "leader", &party.leader_user_id.to_string())?;
    Ok(())
}

pub fn add_party_member(store: &Store, party_id: u64, user_id: u64) -> Result<(), HandlerError> {
    store.sadd(&format!("{}:members", keys::party(party_id)), &user_id.to_string())?;
    Ok(())
}

pub fn remove_party_member(store: &Store, party_id: u64, user_id: u64) -> Result<(), HandlerError> {
    store.srem(&format!("{}:members", keys::party(party_id)), &user_id.to_string())?;
    Ok(())
}

pub fn disband_party(store: &Store, party_id: u64) -> Result<(), HandlerError> {
    let key = keys::party(party_id);
    store.del(&key)?;
    store.del(&format!("{key}:members"))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ClanRecord {
    pub clan_id: u64,
    pub name: String,
    pub leader_user_id: u64,
    pub member_user_ids: Vec<u64>,
}

pub fn load_clan(store: &Store, clan_id: u64) -> Result<Option<ClanRecord>, HandlerError> {
    let key = keys::clan(clan_id);
    let name = store.hget(&key, "name")?;
    let Some(name) = name else { return Ok(None) };
    let leader = store
        .hget(&key, "leader")?
        .ok_or_else(|| anyhow::anyhow!("corrupt clan {clan_id}: missing leader"))?;
    let members = store.smembers(&format!("{key}:members"))?;
    Ok(Some(ClanRecord {
        clan_id,
        name,
        leader_user_id: leader
            .parse()
            .map_err(|_| anyhow::anyhow!("corrupt clan leader for {clan_id}"))?,
        member_user_ids: members
            .into_iter()
            .map(|m| m.parse())
            .collect::<Result<_, _>>()
            .map_err(|_| anyhow::anyhow!("corrupt clan member for {clan_id}"))?,
    }))
}

pub fn save_clan(store: &Store, clan: &ClanRecord) -> Result<(), HandlerError> {
    let key = keys::clan(clan.clan_id);
    store.hset(&key, "name", &clan.name)?;
    store.hset(&key, "leader", &clan.leader_user_id.to_string())?;
    Ok(())
}

pub fn add_clan_member(store: &Store, clan_id: u64, user_id: u64) -> Result<(), HandlerError> {
    store.sadd(&format!("{}:members", keys::clan(clan_id)), &user_id.to_string())?;
    Ok(())
}

pub fn remove_clan_member(store: &Store, clan_id: u64, user_id: u64) -> Result<(), HandlerError> {
    store.srem(&format!("{}:members", keys::clan(clan_id)), &user_id.to_string())?;
    Ok(())
}

pub fn disband_clan(store: &Store, clan_id: u64) -> Result<(), HandlerError> {
    let key = keys::clan(clan_id);
    store.del(&key)?;
    store.del(&format!("{key}:members"))?;
    Ok(())
}
