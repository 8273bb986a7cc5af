use std::sync::LazyLock;

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartRejection},
    },
};
use regex::Regex;
use tracing::{debug, info};

use super::super::AppState;
use super::ApiError;
use crate::core::records::{UpdateInputs, UpdateRecordResponse, UploadedFile};

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .ok()
});

pub(crate) fn is_valid_email(value: &str) -> bool {
    value.len() <= 254
        && EMAIL_RE
            .as_ref()
            .is_some_and(|re| re.is_match(value))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FormPart {
    UserInput,
    ExpectedOutput,
    InstructionFromUser,
    ClientEmailAddress,
}

impl FormPart {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "user_input" | "userInput" => Some(Self::UserInput),
            "expected_output" | "expectedOutput" => Some(Self::ExpectedOutput),
            "instruction_from_user" | "instructionFromUser" => Some(Self::InstructionFromUser),
            "client_email_address" | "clientEmailAddress" => Some(Self::ClientEmailAddress),
            _ => None,
        }
    }
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile, ApiError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content = field.bytes().await?;
    Ok(UploadedFile::new(filename, content))
}

/// Collect the form parts into pipeline inputs. A body that is not
/// multipart at all reads as an empty form.
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UpdateInputs, ApiError> {
    let mut inputs = UpdateInputs::default();
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Treating request as an empty form: {}", rejection);
            return Ok(inputs);
        }
    };

    while let Some(field) = multipart.next_field().await? {
        let Some(part) = field.name().and_then(FormPart::from_name) else {
            debug!("Ignoring form part {:?}", field.name());
            continue;
        };
        match part {
            FormPart::UserInput => inputs.user_input.push(read_file(field).await?),
            FormPart::ExpectedOutput => inputs.expected_output = Some(read_file(field).await?),
            FormPart::InstructionFromUser => inputs.instruction_from_user = Some(field.text().await?),
            FormPart::ClientEmailAddress => inputs.client_email_address = Some(field.text().await?),
        }
    }

    Ok(inputs)
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UpdateRecordResponse>, ApiError> {
    let inputs = read_form(multipart).await?;

    if let Some(email) = &inputs.client_email_address
        && !is_valid_email(email)
    {
        info!(record = %id, "Rejected update with malformed email address");
        return Err(ApiError::bad_request(
            "client_email_address is not a valid email address",
        ));
    }

    let response = state.service.update_record(&id, inputs).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org", "x_y@sub-domain.io"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in ["", "plain", "a@", "@b.co", "a@b", "a b@c.com", "a@@b.com", "a@-b.com", ".a@b.com"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn part_names_accept_camel_case_aliases() {
        assert_eq!(FormPart::from_name("user_input"), Some(FormPart::UserInput));
        assert_eq!(FormPart::from_name("expectedOutput"), Some(FormPart::ExpectedOutput));
        assert_eq!(
            FormPart::from_name("instructionFromUser"),
            Some(FormPart::InstructionFromUser)
        );
        assert_eq!(
            FormPart::from_name("client_email_address"),
            Some(FormPart::ClientEmailAddress)
        );
        assert_eq!(FormPart::from_name("progress"), None);
    }
}
