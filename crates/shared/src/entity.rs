//! Per-entity configuration: which fields a table searches, how it exports,
//! how stores stamp timestamps, and the data an empty store starts with.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    domain::{EntityKind, TimestampPolicy},
    record::{FieldValue, Record},
};

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// How one export cell is derived from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Field(&'static str),
    /// Field text, or the fallback when the field is empty, null or missing.
    FieldOr(&'static str, &'static str),
    /// `Yes` / `No` for a boolean field; anything else renders as `No`.
    YesNo(&'static str),
    Upper(&'static str),
    /// `<reg_no> - <name>` when `name` is present, otherwise the fallback.
    Party {
        reg_no: &'static str,
        name: &'static str,
        fallback: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportColumn {
    pub header: &'static str,
    pub render: Render,
}

impl ExportColumn {
    const fn new(header: &'static str, render: Render) -> Self {
        Self { header, render }
    }

    pub fn value(&self, record: &Record) -> String {
        match self.render {
            Render::Field(name) => record.text(name),
            Render::FieldOr(name, fallback) => record.text_or(name, fallback),
            Render::YesNo(name) => {
                let yes = record
                    .get(name)
                    .and_then(|value| value.as_bool())
                    .unwrap_or(false);
                let label = if yes { "Yes" } else { "No" };
                label.to_string()
            }
            Render::Upper(name) => record.text(name).to_uppercase(),
            Render::Party {
                reg_no,
                name,
                fallback,
            } => {
                let name_text = record.text(name);
                if name_text.is_empty() {
                    fallback.to_string()
                } else {
                    format!("{} - {}", record.text(reg_no), name_text)
                }
            }
        }
    }
}

use Render::{Field, FieldOr, Party, Upper, YesNo};

const ORGANISATION_SEARCH: &[&str] = &[
    "organisationName",
    "email",
    "location",
    "phoneNumber",
    "address",
];
const USER_SEARCH: &[&str] = &["userId", "username", "tutorName", "tutorRegNo"];
const PERSON_SEARCH: &[&str] = &[
    "regNo",
    "nameOfApplicant",
    "nameOfCourse",
    "email",
    "mobileNumber",
    "applicationNumber",
    "nameOfGuardian",
];
const BATCH_SEARCH: &[&str] = &["batchName", "batchCode", "remarks"];
const COURSE_SEARCH: &[&str] = &["courseName", "courseCode", "description", "batchName"];
const PAYMENT_SEARCH: &[&str] = &[
    "referenceNumber",
    "date",
    "studentName",
    "tutorName",
    "studentRegNo",
    "tutorRegNo",
    "amount",
];
const RECEIPT_SEARCH: &[&str] = &[
    "referenceNumber",
    "date",
    "studentName",
    "tutorName",
    "amount",
    "studentRegNo",
    "tutorRegNo",
];

const ORGANISATION_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Organisation Name", Field("organisationName")),
    ExportColumn::new("Address", Field("address")),
    ExportColumn::new("Phone Number", Field("phoneNumber")),
    ExportColumn::new("Email", Field("email")),
    ExportColumn::new("Website", FieldOr("website", "N/A")),
    ExportColumn::new("Location", Field("location")),
    ExportColumn::new("Created At", Field("createdAt")),
];
const USER_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("User ID", Field("userId")),
    ExportColumn::new("Username", Field("username")),
    ExportColumn::new("Tutor Name", Field("tutorName")),
    ExportColumn::new("Tutor Reg No", Field("tutorRegNo")),
    ExportColumn::new("Can Login", YesNo("canLogin")),
    ExportColumn::new("Created At", Field("createdAt")),
];
const PERSON_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Reg No", Field("regNo")),
    ExportColumn::new("Date", Field("date")),
    ExportColumn::new("Name", Field("nameOfApplicant")),
    ExportColumn::new("Course", Field("nameOfCourse")),
    ExportColumn::new("Guardian Name", Field("nameOfGuardian")),
    ExportColumn::new("Relationship", Field("relationshipWithGuardian")),
    ExportColumn::new("Occupation", Field("occupationOfGuardian")),
    ExportColumn::new("Mobile", Field("mobileNumber")),
    ExportColumn::new("Email", Field("email")),
    ExportColumn::new("DOB", Field("dateOfBirth")),
    ExportColumn::new("Sex", Field("sex")),
    ExportColumn::new("Marital Status", Field("maritalStatus")),
    ExportColumn::new("Religion", Field("religion")),
    ExportColumn::new("Category", Field("religionCategory")),
    ExportColumn::new("Qualification", Field("educationalQualification")),
    ExportColumn::new("Application No", Field("applicationNumber")),
    ExportColumn::new("Class Time", Field("classTime")),
    ExportColumn::new("Total Fee", Field("totalCourseFee")),
    ExportColumn::new("Admitted By", Field("admittedBy")),
];
const BATCH_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Batch Name", Field("batchName")),
    ExportColumn::new("Batch Code", Field("batchCode")),
    ExportColumn::new("Remarks", FieldOr("remarks", "N/A")),
    ExportColumn::new("Created At", Field("createdAt")),
];
const COURSE_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Course Code", Field("courseCode")),
    ExportColumn::new("Course Name", Field("courseName")),
    ExportColumn::new("Description", Field("description")),
    ExportColumn::new("Duration (Months)", Field("duration")),
    ExportColumn::new("Total Fee", Field("totalFee")),
    ExportColumn::new("Batch", Field("batchName")),
    ExportColumn::new("Is Active", YesNo("isActive")),
    ExportColumn::new("Created At", Field("createdAt")),
];
const PAYMENT_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Date", Field("date")),
    ExportColumn::new("Reference Number", Field("referenceNumber")),
    ExportColumn::new("Transaction Type", Field("transactionType")),
    ExportColumn::new("Amount", Field("amount")),
    ExportColumn::new(
        "Student",
        Party {
            reg_no: "studentRegNo",
            name: "studentName",
            fallback: "",
        },
    ),
    ExportColumn::new(
        "Tutor",
        Party {
            reg_no: "tutorRegNo",
            name: "tutorName",
            fallback: "",
        },
    ),
    ExportColumn::new("Remarks", Field("remarks")),
];
const RECEIPT_EXPORT: &[ExportColumn] = &[
    ExportColumn::new("Date", Field("date")),
    ExportColumn::new("Reference Number", Field("referenceNumber")),
    ExportColumn::new("Transaction Type", Upper("transactionType")),
    ExportColumn::new("Amount", Field("amount")),
    ExportColumn::new(
        "Student",
        Party {
            reg_no: "studentRegNo",
            name: "studentName",
            fallback: "-",
        },
    ),
    ExportColumn::new(
        "Tutor",
        Party {
            reg_no: "tutorRegNo",
            name: "tutorName",
            fallback: "-",
        },
    ),
    ExportColumn::new("Remarks", FieldOr("remarks", "-")),
];

impl EntityKind {
    /// Fields the entity's table matches free-text search against.
    pub fn searchable_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Organisation => ORGANISATION_SEARCH,
            EntityKind::User => USER_SEARCH,
            EntityKind::Person => PERSON_SEARCH,
            EntityKind::Batch => BATCH_SEARCH,
            EntityKind::Course => COURSE_SEARCH,
            EntityKind::Payment => PAYMENT_SEARCH,
            EntityKind::Receipt => RECEIPT_SEARCH,
        }
    }

    pub fn export_columns(self) -> &'static [ExportColumn] {
        match self {
            EntityKind::Organisation => ORGANISATION_EXPORT,
            EntityKind::User => USER_EXPORT,
            EntityKind::Person => PERSON_EXPORT,
            EntityKind::Batch => BATCH_EXPORT,
            EntityKind::Course => COURSE_EXPORT,
            EntityKind::Payment => PAYMENT_EXPORT,
            EntityKind::Receipt => RECEIPT_EXPORT,
        }
    }

    pub fn stamp_created(self, record: &mut Record, now: DateTime<Utc>) {
        match self.timestamp_policy() {
            TimestampPolicy::CalendarDate => {
                let today = calendar_date(now);
                record.set(CREATED_AT_FIELD, today.clone());
                record.set(UPDATED_AT_FIELD, today);
            }
            TimestampPolicy::CreatedInstant => {
                record.set(CREATED_AT_FIELD, instant(now));
            }
            TimestampPolicy::None => {}
        }
    }

    pub fn stamp_updated(self, record: &mut Record, now: DateTime<Utc>) {
        if self.timestamp_policy() == TimestampPolicy::CalendarDate {
            record.set(UPDATED_AT_FIELD, calendar_date(now));
        }
    }
}

pub fn calendar_date(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

fn instant(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonRole {
    Student,
    Tutor,
}

impl PersonRole {
    pub fn reg_no_prefix(self) -> &'static str {
        match self {
            PersonRole::Student => "STU",
            PersonRole::Tutor => "TUT",
        }
    }

    pub fn of(person: &Record) -> Option<Self> {
        let reg_no = person.get("regNo").and_then(|value| value.as_str())?;
        [PersonRole::Student, PersonRole::Tutor]
            .into_iter()
            .find(|role| reg_no.starts_with(role.reg_no_prefix()))
    }

    pub fn retain(self, persons: Vec<Record>) -> Vec<Record> {
        persons
            .into_iter()
            .filter(|person| PersonRole::of(person) == Some(self))
            .collect()
    }
}

pub fn persons_with_reg_no(persons: Vec<Record>, reg_no: &str) -> Vec<Record> {
    persons
        .into_iter()
        .filter(|person| person.get("regNo").and_then(|v| v.as_str()) == Some(reg_no))
        .collect()
}

/// What an empty store holds after seeding.
pub fn default_seed() -> Vec<(EntityKind, Vec<Record>)> {
    let admin = Record::new()
        .with("id", 1)
        .with("username", "admin")
        .with("password", "admin123")
        .with("userId", "USR0001")
        .with("tutorId", FieldValue::Null)
        .with("canLogin", true)
        .with("role", "admin")
        .with("createdAt", "2024-01-01T00:00:00.000Z");
    let school = Record::new()
        .with("id", 1)
        .with("organisationName", "ABC School")
        .with("address", "123 Main Street, New York")
        .with("phoneNumber", "9123456789")
        .with("email", "contact@abcschool.edu")
        .with("website", "https://www.abcschool.edu")
        .with("location", "New York, State, Country")
        .with("latitude", 40.7128)
        .with("longitude", -74.0060)
        .with("logo", FieldValue::Null)
        .with("header", FieldValue::Null)
        .with("footer", FieldValue::Null)
        .with("seal", FieldValue::Null)
        .with("remarks", "Premium institution")
        .with("createdAt", "2024-01-15")
        .with("updatedAt", "2024-01-15");
    vec![
        (EntityKind::User, vec![admin]),
        (EntityKind::Organisation, vec![school]),
    ]
}
