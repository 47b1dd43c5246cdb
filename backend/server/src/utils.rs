use std::collections::HashMap;

use axum::extract::Multipart;
use bank::{
    models::{Medium, NewResource, ResourceType, Term},
    reference,
    utils::slug,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::AppError::{self, MalformedPayload, MissingField};

pub const PDF: &str = "application/pdf";
const YEARS: std::ops::RangeInclusive<u16> = 1950..=2100;

pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct UploadForm {
    pub resource: NewResource,
    pub file: Option<UploadedFile>,
}

pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MalformedPayload(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| MalformedPayload(e.body_text()))?;

            if !bytes.is_empty() {
                file = Some(check_file(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                })?);
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| MalformedPayload(e.body_text()))?;
        fields.insert(name, value);
    }

    Ok(UploadForm {
        resource: build_new_resource(&fields)?,
        file,
    })
}

/// The `%PDF` signature decides; a declared type, if any, must not contradict it.
fn check_file(file: UploadedFile) -> Result<UploadedFile, AppError> {
    let declared_ok = matches!(
        file.content_type.as_str(),
        PDF | "application/octet-stream" | "application/x-pdf"
    );

    if !file.bytes.starts_with(b"%PDF") || !declared_ok {
        return Err(MalformedPayload("only PDF files are accepted".to_string()));
    }

    Ok(file)
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &'static str) -> Result<&'a str, AppError> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(MissingField(name))
}

fn optional<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

pub fn build_new_resource(fields: &HashMap<String, String>) -> Result<NewResource, AppError> {
    let title = required(fields, "title")?;
    let kind = required(fields, "type")?.parse::<ResourceType>()?;
    let grade_id = required(fields, "gradeId")?;
    let subject_id = required(fields, "subjectId")?;
    let medium = required(fields, "medium")?.parse::<Medium>()?;

    if reference::grade(grade_id).is_none() {
        return Err(MalformedPayload(format!("unknown grade {grade_id}")));
    }
    if reference::subject(subject_id).is_none() {
        return Err(MalformedPayload(format!("unknown subject {subject_id}")));
    }

    let term = optional(fields, "term").map(str::parse::<Term>).transpose()?;

    let year = optional(fields, "year")
        .map(|y| {
            y.parse::<u16>()
                .ok()
                .filter(|y| YEARS.contains(y))
                .ok_or_else(|| MalformedPayload(format!("invalid year {y}")))
        })
        .transpose()?;

    Ok(NewResource {
        title: title.to_string(),
        kind,
        grade_id: grade_id.to_string(),
        subject_id: subject_id.to_string(),
        term,
        year,
        medium,
        file_url: optional(fields, "fileUrl").map(str::to_string),
    })
}

/// `<grade>/<subject>/<title-slug>-<8 hex>.pdf`
pub fn object_path(resource: &NewResource) -> String {
    let mut name = slug(&resource.title);
    if name.is_empty() {
        name = "paper".to_string();
    }

    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "{}/{}/{name}-{}.pdf",
        resource.grade_id,
        resource.subject_id,
        &suffix[..8]
    )
}
