use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Provenance used by publications uploaded by hand through the admin frontend.
pub const MANUAL_UPLOAD_PROVENANCE: &str = "MANUAL_UPLOAD";

/// Identifier assigned to an artefact on first ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtefactId(pub Uuid);

impl ArtefactId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ArtefactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ArtefactId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Raised when a header carries a value outside of an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a recognised {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Case-insensitive lookup of an enumerated header value by its wire label.
fn parse_label<T: Copy>(
    variants: &[T],
    label: fn(T) -> &'static str,
    kind: &'static str,
    value: &str,
) -> Result<T, UnknownVariant> {
    let normalized = value.trim().to_ascii_uppercase();
    variants
        .iter()
        .copied()
        .find(|variant| label(*variant) == normalized)
        .ok_or_else(|| UnknownVariant {
            kind,
            value: value.to_string(),
        })
}

/// Broad category of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtefactType {
    List,
    Outcome,
    GeneralPublication,
}

impl ArtefactType {
    pub const ALL: &'static [Self] = &[Self::List, Self::Outcome, Self::GeneralPublication];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "LIST",
            Self::Outcome => "OUTCOME",
            Self::GeneralPublication => "GENERAL_PUBLICATION",
        }
    }
}

impl fmt::Display for ArtefactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtefactType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "artefact type", value)
    }
}

/// Access-control classification of an artefact. Each tier is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    Public,
    Private,
    Classified,
}

impl Sensitivity {
    pub const ALL: &'static [Self] = &[Self::Public, Self::Private, Self::Classified];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Classified => "CLASSIFIED",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensitivity {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "sensitivity", value)
    }
}

/// Language the publication is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    Welsh,
    BiLingual,
}

impl Language {
    pub const ALL: &'static [Self] = &[Self::English, Self::Welsh, Self::BiLingual];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::English => "ENGLISH",
            Self::Welsh => "WELSH",
            Self::BiLingual => "BI_LINGUAL",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "language", value)
    }
}

/// Identity provider that vouched for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserProvenance {
    PiAad,
    CftIdam,
    CrimeIdam,
}

impl UserProvenance {
    pub const ALL: &'static [Self] = &[Self::PiAad, Self::CftIdam, Self::CrimeIdam];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PiAad => "PI_AAD",
            Self::CftIdam => "CFT_IDAM",
            Self::CrimeIdam => "CRIME_IDAM",
        }
    }
}

impl fmt::Display for UserProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserProvenance {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "user provenance", value)
    }
}

/// Account role; only `VERIFIED` consumers see restricted artefacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Verified,
    InternalSuperAdminCtsc,
    InternalSuperAdminLocal,
    InternalAdminCtsc,
    InternalAdminLocal,
    SystemAdmin,
    Technical,
}

impl UserRole {
    pub const ALL: &'static [Self] = &[
        Self::Verified,
        Self::InternalSuperAdminCtsc,
        Self::InternalSuperAdminLocal,
        Self::InternalAdminCtsc,
        Self::InternalAdminLocal,
        Self::SystemAdmin,
        Self::Technical,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::InternalSuperAdminCtsc => "INTERNAL_SUPER_ADMIN_CTSC",
            Self::InternalSuperAdminLocal => "INTERNAL_SUPER_ADMIN_LOCAL",
            Self::InternalAdminCtsc => "INTERNAL_ADMIN_CTSC",
            Self::InternalAdminLocal => "INTERNAL_ADMIN_LOCAL",
            Self::SystemAdmin => "SYSTEM_ADMIN",
            Self::Technical => "TECHNICAL",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "user role", value)
    }
}

/// Document template tag selecting the schema family and classified audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListType {
    SjpPublicList,
    SjpPressList,
    CrownDailyList,
    CrownFirmList,
    CrownWarnedList,
    MagistratesPublicList,
    MagistratesStandardList,
    CivilDailyCauseList,
    FamilyDailyCauseList,
    CivilAndFamilyDailyCauseList,
    CopDailyCauseList,
    SscsDailyList,
    IacDailyList,
    EtDailyList,
    EtFortnightlyPressList,
    PrimaryHealthList,
    CareStandardsList,
}

impl ListType {
    pub const ALL: &'static [Self] = &[
        Self::SjpPublicList,
        Self::SjpPressList,
        Self::CrownDailyList,
        Self::CrownFirmList,
        Self::CrownWarnedList,
        Self::MagistratesPublicList,
        Self::MagistratesStandardList,
        Self::CivilDailyCauseList,
        Self::FamilyDailyCauseList,
        Self::CivilAndFamilyDailyCauseList,
        Self::CopDailyCauseList,
        Self::SscsDailyList,
        Self::IacDailyList,
        Self::EtDailyList,
        Self::EtFortnightlyPressList,
        Self::PrimaryHealthList,
        Self::CareStandardsList,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SjpPublicList => "SJP_PUBLIC_LIST",
            Self::SjpPressList => "SJP_PRESS_LIST",
            Self::CrownDailyList => "CROWN_DAILY_LIST",
            Self::CrownFirmList => "CROWN_FIRM_LIST",
            Self::CrownWarnedList => "CROWN_WARNED_LIST",
            Self::MagistratesPublicList => "MAGISTRATES_PUBLIC_LIST",
            Self::MagistratesStandardList => "MAGISTRATES_STANDARD_LIST",
            Self::CivilDailyCauseList => "CIVIL_DAILY_CAUSE_LIST",
            Self::FamilyDailyCauseList => "FAMILY_DAILY_CAUSE_LIST",
            Self::CivilAndFamilyDailyCauseList => "CIVIL_AND_FAMILY_DAILY_CAUSE_LIST",
            Self::CopDailyCauseList => "COP_DAILY_CAUSE_LIST",
            Self::SscsDailyList => "SSCS_DAILY_LIST",
            Self::IacDailyList => "IAC_DAILY_LIST",
            Self::EtDailyList => "ET_DAILY_LIST",
            Self::EtFortnightlyPressList => "ET_FORTNIGHTLY_PRESS_LIST",
            Self::PrimaryHealthList => "PRIMARY_HEALTH_LIST",
            Self::CareStandardsList => "CARE_STANDARDS_LIST",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "list type", value)
    }
}

/// Group of list types sharing one structural schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaFamily {
    SjpPublicList,
    SjpPressList,
    CrimeList,
    DailyCauseList,
    TribunalList,
}

impl SchemaFamily {
    pub const ALL: &'static [Self] = &[
        Self::SjpPublicList,
        Self::SjpPressList,
        Self::CrimeList,
        Self::DailyCauseList,
        Self::TribunalList,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SjpPublicList => "SJP_PUBLIC_LIST",
            Self::SjpPressList => "SJP_PRESS_LIST",
            Self::CrimeList => "CRIME_LIST",
            Self::DailyCauseList => "DAILY_CAUSE_LIST",
            Self::TribunalList => "TRIBUNAL_LIST",
        }
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaFamily {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_label(Self::ALL, Self::as_str, "schema family", value)
    }
}

impl ListType {
    /// The only user provenance allowed to read CLASSIFIED artefacts of this list type.
    pub const fn provenance(self) -> UserProvenance {
        match self {
            Self::SjpPublicList | Self::SjpPressList => UserProvenance::PiAad,
            Self::CrownDailyList
            | Self::CrownFirmList
            | Self::CrownWarnedList
            | Self::MagistratesPublicList
            | Self::MagistratesStandardList => UserProvenance::CrimeIdam,
            Self::CivilDailyCauseList
            | Self::FamilyDailyCauseList
            | Self::CivilAndFamilyDailyCauseList
            | Self::CopDailyCauseList
            | Self::SscsDailyList
            | Self::IacDailyList
            | Self::EtDailyList
            | Self::EtFortnightlyPressList
            | Self::PrimaryHealthList
            | Self::CareStandardsList => UserProvenance::CftIdam,
        }
    }

    pub const fn schema_family(self) -> SchemaFamily {
        match self {
            Self::SjpPublicList => SchemaFamily::SjpPublicList,
            Self::SjpPressList => SchemaFamily::SjpPressList,
            Self::CrownDailyList
            | Self::CrownFirmList
            | Self::CrownWarnedList
            | Self::MagistratesPublicList
            | Self::MagistratesStandardList => SchemaFamily::CrimeList,
            Self::CivilDailyCauseList
            | Self::FamilyDailyCauseList
            | Self::CivilAndFamilyDailyCauseList
            | Self::CopDailyCauseList => SchemaFamily::DailyCauseList,
            Self::SscsDailyList
            | Self::IacDailyList
            | Self::EtDailyList
            | Self::EtFortnightlyPressList
            | Self::PrimaryHealthList
            | Self::CareStandardsList => SchemaFamily::TribunalList,
        }
    }
}

impl SchemaFamily {
    /// File stem used when loading schemas from a directory.
    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str().to_ascii_lowercase())
    }
}

/// Validated submission metadata attached to one ingestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderGroup {
    pub provenance: String,
    pub source_artefact_id: String,
    pub artefact_type: ArtefactType,
    pub sensitivity: Sensitivity,
    pub language: Language,
    pub display_from: NaiveDateTime,
    pub display_to: NaiveDateTime,
    pub list_type: ListType,
    pub location_id: String,
    pub content_date: NaiveDateTime,
}

/// Extracted searchable values keyed by configured field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerms(BTreeMap<String, Vec<Value>>);

impl SearchTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the values under `field`; an empty list leaves the map untouched.
    pub fn insert(&mut self, field: impl Into<String>, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        self.0.insert(field.into(), values);
    }

    pub fn get(&self, field: &str) -> Option<&[Value]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Case-insensitive match of a scalar search value under `field`.
    pub fn matches(&self, field: &str, needle: &str) -> bool {
        let needle = needle.trim();
        self.get(field).is_some_and(|values| {
            values.iter().any(|value| match value {
                Value::String(text) => text.trim().eq_ignore_ascii_case(needle),
                Value::Number(number) => number.to_string() == needle,
                Value::Bool(flag) => flag.to_string().eq_ignore_ascii_case(needle),
                _ => false,
            })
        })
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Value>> {
        self.0
    }
}

impl From<BTreeMap<String, Vec<Value>>> for SearchTerms {
    fn from(map: BTreeMap<String, Vec<Value>>) -> Self {
        let mut terms = Self::new();
        for (field, values) in map {
            terms.insert(field, values);
        }
        terms
    }
}

/// Pointer to a payload body held in the external object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadReference {
    pub key: String,
    pub content_type: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// One ingested publication and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artefact {
    pub artefact_id: ArtefactId,
    pub provenance: String,
    pub source_artefact_id: String,
    pub artefact_type: ArtefactType,
    pub list_type: ListType,
    pub sensitivity: Sensitivity,
    pub language: Language,
    pub location_id: String,
    pub content_date: NaiveDateTime,
    pub display_from: NaiveDateTime,
    pub display_to: NaiveDateTime,
    pub expiry_date: NaiveDate,
    pub payload: PayloadReference,
    pub search: SearchTerms,
    pub is_flat_file: bool,
    pub superseded_count: u32,
}

impl Artefact {
    pub fn is_displayed_at(&self, now: NaiveDateTime) -> bool {
        self.display_from <= now && now <= self.display_to
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// Consumer identity as reported by the account-management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub role: UserRole,
    pub provenance: UserProvenance,
}

/// Source-system specific identifier for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationReference {
    pub provenance: String,
    pub source_location_id: String,
}

/// Court or tribunal location reference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: String,
    pub name: String,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub references: Vec<LocationReference>,
}
