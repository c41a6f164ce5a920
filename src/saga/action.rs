//! Closed action set and per-action payloads.
//!
//! `Action` is a tag identifying the kind of operation a step performs; `Payload` is a
//! matching tagged union so a step's data is always one concrete, exhaustively-matchable
//! shape rather than a runtime type assertion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(alias = "AwardInventory")]
    AwardAsset,
    AwardExperience,
    AwardLevel,
    AwardMesos,
    WarpToRandomPortal,
    WarpToPortal,
    DestroyAsset,
    EquipAsset,
    UnequipAsset,
    ChangeJob,
    CreateSkill,
    UpdateSkill,
    ValidateCharacterState,
    RequestGuildName,
    RequestGuildEmblem,
    RequestGuildDisband,
    RequestGuildCapacityIncrease,
    CreateInvite,
    CreateCharacter,
    CreateAndEquipAsset,
}

impl Action {
    /// Whether this action's handler emits a command and a later correlator
    /// synthesizes a further step, rather than completing on a single event.
    pub fn is_compound(self) -> bool {
        matches!(self, Action::CreateAndEquipAsset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum Payload {
    #[serde(alias = "AwardInventory")]
    AwardAsset(AwardAssetPayload),
    AwardExperience(AwardExperiencePayload),
    AwardLevel(AwardLevelPayload),
    AwardMesos(AwardMesosPayload),
    WarpToRandomPortal(WarpToRandomPortalPayload),
    WarpToPortal(WarpToPortalPayload),
    DestroyAsset(DestroyAssetPayload),
    EquipAsset(EquipAssetPayload),
    UnequipAsset(EquipAssetPayload),
    ChangeJob(ChangeJobPayload),
    CreateSkill(CreateSkillPayload),
    UpdateSkill(UpdateSkillPayload),
    ValidateCharacterState(ValidateCharacterStatePayload),
    RequestGuildName(RequestGuildNamePayload),
    RequestGuildEmblem(RequestGuildEmblemPayload),
    RequestGuildDisband(RequestGuildDisbandPayload),
    RequestGuildCapacityIncrease(RequestGuildCapacityIncreasePayload),
    CreateInvite(CreateInvitePayload),
    CreateCharacter(CreateCharacterPayload),
    CreateAndEquipAsset(CreateAndEquipAssetPayload),
}

impl Payload {
    pub fn action(&self) -> Action {
        match self {
            Payload::AwardAsset(_) => Action::AwardAsset,
            Payload::AwardExperience(_) => Action::AwardExperience,
            Payload::AwardLevel(_) => Action::AwardLevel,
            Payload::AwardMesos(_) => Action::AwardMesos,
            Payload::WarpToRandomPortal(_) => Action::WarpToRandomPortal,
            Payload::WarpToPortal(_) => Action::WarpToPortal,
            Payload::DestroyAsset(_) => Action::DestroyAsset,
            Payload::EquipAsset(_) => Action::EquipAsset,
            Payload::UnequipAsset(_) => Action::UnequipAsset,
            Payload::ChangeJob(_) => Action::ChangeJob,
            Payload::CreateSkill(_) => Action::CreateSkill,
            Payload::UpdateSkill(_) => Action::UpdateSkill,
            Payload::ValidateCharacterState(_) => Action::ValidateCharacterState,
            Payload::RequestGuildName(_) => Action::RequestGuildName,
            Payload::RequestGuildEmblem(_) => Action::RequestGuildEmblem,
            Payload::RequestGuildDisband(_) => Action::RequestGuildDisband,
            Payload::RequestGuildCapacityIncrease(_) => Action::RequestGuildCapacityIncrease,
            Payload::CreateInvite(_) => Action::CreateInvite,
            Payload::CreateCharacter(_) => Action::CreateCharacter,
            Payload::CreateAndEquipAsset(_) => Action::CreateAndEquipAsset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardAssetPayload {
    pub character_id: i64,
    pub template_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardExperiencePayload {
    pub character_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardLevelPayload {
    pub character_id: i64,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardMesosPayload {
    pub character_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpToRandomPortalPayload {
    pub character_id: i64,
    pub map_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpToPortalPayload {
    pub character_id: i64,
    pub map_id: i32,
    pub portal_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestroyAssetPayload {
    pub character_id: i64,
    pub template_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipAssetPayload {
    pub character_id: i64,
    pub inventory_type: i32,
    pub source: i16,
    pub destination: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeJobPayload {
    pub character_id: i64,
    pub job_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSkillPayload {
    pub character_id: i64,
    pub skill_id: i32,
    pub skill_level: i32,
    pub master_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSkillPayload {
    pub character_id: i64,
    pub skill_id: i32,
    pub skill_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCharacterStatePayload {
    pub character_id: i64,
    pub expected_job_id: Option<i32>,
    pub expected_min_level: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildNamePayload {
    pub guild_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildEmblemPayload {
    pub guild_id: i64,
    pub background_id: i16,
    pub background_color: i16,
    pub logo_id: i16,
    pub logo_color: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildDisbandPayload {
    pub guild_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildCapacityIncreasePayload {
    pub guild_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitePayload {
    pub invite_type: String,
    pub referrer_id: i64,
    pub target_id: i64,
    pub reference_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCharacterPayload {
    pub account_id: i64,
    pub name: String,
    pub job_index: i32,
    pub face: i32,
    pub hair: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAndEquipAssetPayload {
    pub character_id: i64,
    pub template_id: i64,
    pub quantity: i32,
}

/// Used to thread the spawning saga's correlation id through a derived command.
pub type CorrelationId = Uuid;
