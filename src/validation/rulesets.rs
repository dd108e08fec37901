//! Built-in rule sets for the event site.
//!
//! Names follow `<resource>.<action>`. Character classes accept Latin
//! letters plus Hiragana, Katakana and CJK ideographs.

use chrono::{DateTime, Duration, Months, Utc};
use serde_json::Value;

use crate::validation::error::ConfigurationError;
use crate::validation::predicates;
use crate::validation::rule::{CustomContext, RuleSet};

const ID: &str = r"^[a-zA-Z0-9\-_]{3,50}$";
const PHONE: &str = r"^[\+]?[\d\s\-\(\)]{10,15}$";
const TIME: &str = r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$";
const FILE_NAME: &str = r"^[a-zA-Z0-9\-_. ]+\.[a-zA-Z0-9]+$";
const PERSON_NAME: &str = r"^[a-zA-Z\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}\s\-'.]+$";
const TAG: &str = r"^[a-zA-Z0-9\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}\-_]+$";
const EVENT_TITLE: &str = r"^[a-zA-Z0-9\s\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}！？・（）()\[\]「」『』【】〈〉《》、。,.\-_]+$";
const TALK_TITLE: &str = r"^[a-zA-Z0-9\s\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FAF}！？・（）()\[\]「」『』【】〈〉《》、。,.\-_:;]+$";

const CATEGORIES: &[&str] = &[
    "technology",
    "business",
    "design",
    "lifestyle",
    "science",
    "education",
    "entertainment",
    "other",
];
const PARTICIPATION_TYPES: &[&str] = &["online", "offline", "hybrid"];

/// Extensions rejected on upload regardless of the declared file type.
pub const SUSPICIOUS_EXTENSIONS: &[&str] = &[".php", ".asp", ".jsp", ".exe", ".sh", ".bat", ".cmd", ".scr"];

/// Every built-in rule set, in registration order.
pub fn builtin() -> Result<Vec<RuleSet>, ConfigurationError> {
    Ok(vec![
        event_create()?,
        event_update()?,
        participant_register()?,
        participant_update()?,
        talk_submit()?,
        talk_update()?,
        admin_update_participant()?,
        admin_update_talk()?,
        query_pagination()?,
        query_search()?,
        file_upload()?,
    ])
}

fn event_create() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("event.create")
        .field("title", |f| {
            f.required("Event title is required")
                .length(5, 100, "Event title must be between 5 and 100 characters")
                .pattern(EVENT_TITLE, "Event title contains invalid characters")
        })
        .field("description", |f| {
            f.length(10, 2000, "Event description must be between 10 and 2000 characters")
        })
        .field("eventDate", |f| {
            f.required("Event date is required")
                .iso_date("Event date must be a valid ISO 8601 date")
                .custom("Event date must be in the future", |ctx| {
                    Ok(own_date(ctx).is_none_or(|date| date > Utc::now()))
                })
                .custom("Event date cannot be more than 2 years in the future", |ctx| {
                    let limit = Utc::now().checked_add_months(Months::new(24));
                    Ok(match (own_date(ctx), limit) {
                        (Some(date), Some(limit)) => date <= limit,
                        _ => true,
                    })
                })
        })
        .field("endDate", |f| {
            f.iso_date("End date must be a valid ISO 8601 date")
                .custom("End date must be after start date", |ctx| {
                    Ok(match (own_date(ctx), payload_date(ctx, "eventDate")) {
                        (Some(end), Some(start)) => end > start,
                        _ => true,
                    })
                })
                .custom("Event duration cannot exceed 24 hours", |ctx| {
                    Ok(match (own_date(ctx), payload_date(ctx, "eventDate")) {
                        (Some(end), Some(start)) => end - start <= Duration::hours(24),
                        _ => true,
                    })
                })
        })
        .field("venue.name", |f| {
            f.length(2, 100, "Venue name must be between 2 and 100 characters")
        })
        .field("venue.address", |f| {
            f.length(5, 200, "Venue address must be between 5 and 200 characters")
        })
        .field("venue.capacity", |f| {
            f.int_range(Some(1), Some(10_000), "Venue capacity must be between 1 and 10000")
        })
        .field("venue.online", |f| f.boolean("Online field must be a boolean"))
        .field("venue.onlineUrl", |f| {
            f.custom_even_if_absent("Online URL is required when event is online", |ctx| {
                let online = ctx.field("venue.online").is_some_and(predicates::is_truthy);
                Ok(!online || !predicates::is_blank(ctx.value))
            })
            .custom("Online URL must be a valid HTTP/HTTPS URL", optional_url)
        })
        .field("maxTalks", |f| {
            f.int_range(Some(1), Some(50), "Maximum talks must be between 1 and 50")
        })
        .field("talkDuration", |f| {
            f.int_range(Some(1), Some(60), "Talk duration must be between 1 and 60 minutes")
        })
        .field("registrationDeadline", |f| {
            f.iso_date("Registration deadline must be a valid ISO 8601 date")
                .custom("Registration deadline must be before event date", |ctx| {
                    Ok(match (own_date(ctx), payload_date(ctx, "eventDate")) {
                        (Some(deadline), Some(event)) => deadline < event,
                        _ => true,
                    })
                })
        })
        .field("tags", |f| f.array(Some(10), "Tags must be an array with maximum 10 items"))
        .field("tags.*", |f| {
            f.length(1, 30, "Each tag must be between 1 and 30 characters")
                .pattern(TAG, "Tags can only contain letters, numbers, hyphens, and underscores")
        })
        .build()
}

fn event_update() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("event.update")
        .field("id", |f| {
            f.required("Event ID is required").pattern(
                ID,
                "Event ID must be alphanumeric with hyphens/underscores, 3-50 characters",
            )
        })
        .field("title", |f| {
            f.length(5, 100, "Event title must be between 5 and 100 characters")
        })
        .field("description", |f| {
            f.length(10, 2000, "Event description must be between 10 and 2000 characters")
        })
        .field("eventDate", |f| f.iso_date("Event date must be a valid ISO 8601 date"))
        .field("venue.capacity", |f| {
            f.int_range(Some(1), Some(10_000), "Venue capacity must be between 1 and 10000")
        })
        .build()
}

fn participant_register() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("participant.register")
        .field("eventId", |f| {
            f.pattern(ID, "Event ID must be alphanumeric with hyphens/underscores, 3-50 characters")
        })
        .field("name", |f| {
            f.required("Name is required")
                .length(3, 100, "Name must be between 3 and 100 characters")
                .pattern(PERSON_NAME, "Name contains invalid characters")
        })
        .field("email", |f| {
            f.required("Email address is required")
                .email("Must be a valid email address")
                .max_length(320, "Email address is too long")
        })
        .field("phone", |f| {
            f.pattern(PHONE, "Phone number must be a valid format")
                .length(10, 15, "Phone number must be between 10 and 15 digits")
        })
        .field("company", |f| f.max_length(100, "Company name must not exceed 100 characters"))
        .field("jobTitle", |f| f.max_length(100, "Job title must not exceed 100 characters"))
        .field("participationType", |f| {
            f.one_of(PARTICIPATION_TYPES, "Participation type must be online, offline, or hybrid")
        })
        .field("dietaryRestrictions", |f| {
            f.max_length(500, "Dietary restrictions must not exceed 500 characters")
        })
        .field("emergencyContact.name", |f| {
            f.length(2, 100, "Emergency contact name must be between 2 and 100 characters")
        })
        .field("emergencyContact.phone", |f| {
            f.pattern(PHONE, "Emergency contact phone must be a valid format")
        })
        .field("marketingConsent", |f| f.boolean("Marketing consent must be a boolean"))
        .field("privacyConsent", |f| {
            f.required("Privacy consent is required")
                .boolean("Privacy consent is required")
                .custom("Privacy consent must be accepted", |ctx| {
                    Ok(ctx.value.is_some_and(predicates::is_truthy))
                })
        })
        .field("surveys", |f| f.array(Some(10), "Surveys must be an array with maximum 10 items"))
        .field("surveys.*.question", |f| {
            f.length(5, 200, "Survey question must be between 5 and 200 characters")
        })
        .field("surveys.*.answer", |f| {
            f.max_length(1000, "Survey answer must not exceed 1000 characters")
        })
        .build()
}

fn participant_update() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("participant.update")
        .field("id", |f| {
            f.required("Participant ID is required")
                .pattern(ID, "Participant ID must be alphanumeric with hyphens/underscores")
        })
        .field("name", |f| f.length(3, 100, "Name must be between 3 and 100 characters"))
        .field("phone", |f| f.pattern(PHONE, "Phone number must be a valid format"))
        .field("participationType", |f| {
            f.one_of(PARTICIPATION_TYPES, "Participation type must be online, offline, or hybrid")
        })
        .build()
}

fn talk_submit() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("talk.submit")
        .field("eventId", |f| {
            f.required("Event ID is required")
                .pattern(ID, "Event ID must be alphanumeric with hyphens/underscores")
        })
        .field("speakerName", |f| {
            f.required("Speaker name is required")
                .length(2, 100, "Speaker name must be between 2 and 100 characters")
                .pattern(PERSON_NAME, "Speaker name contains invalid characters")
        })
        .field("speakerEmail", |f| {
            f.required("Speaker email is required")
                .email("Must be a valid email address")
        })
        .field("title", |f| {
            f.required("Talk title is required")
                .length(5, 100, "Talk title must be between 5 and 100 characters")
                .pattern(TALK_TITLE, "Talk title contains invalid characters")
        })
        .field("description", |f| {
            f.required("Talk description is required")
                .length(20, 2000, "Talk description must be between 20 and 2000 characters")
        })
        .field("category", |f| {
            f.required("Category is required")
                .one_of(CATEGORIES, "Category must be a valid option")
        })
        .field("duration", |f| {
            f.int_range(Some(1), Some(60), "Duration must be between 1 and 60 minutes")
        })
        .field("targetAudience", |f| {
            f.required("Target audience is required").one_of(
                &["beginner", "intermediate", "advanced", "all"],
                "Target audience must be beginner, intermediate, advanced, or all",
            )
        })
        .field("needsProjector", |f| f.boolean("Needs projector must be a boolean"))
        .field("slides", |f| f.custom("Slides URL must be a valid HTTP/HTTPS URL", optional_url))
        .field("materials", |f| {
            f.array(Some(5), "Materials must be an array with maximum 5 items")
        })
        .field("materials.*.name", |f| {
            f.length(1, 100, "Material name must be between 1 and 100 characters")
        })
        .field("materials.*.url", |f| f.custom("Material URL must be valid", optional_url))
        .field("speakerBio", |f| f.max_length(500, "Speaker bio must not exceed 500 characters"))
        .field("previousExperience", |f| {
            f.boolean("Previous experience must be a boolean")
        })
        .field("specialRequirements", |f| {
            f.max_length(500, "Special requirements must not exceed 500 characters")
        })
        .build()
}

fn talk_update() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("talk.update")
        .field("id", |f| {
            f.required("Talk ID is required")
                .pattern(ID, "Talk ID must be alphanumeric with hyphens/underscores")
        })
        .field("title", |f| f.length(5, 100, "Talk title must be between 5 and 100 characters"))
        .field("description", |f| {
            f.length(20, 2000, "Talk description must be between 20 and 2000 characters")
        })
        .field("category", |f| f.one_of(CATEGORIES, "Category must be a valid option"))
        .build()
}

fn admin_update_participant() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("admin.updateParticipant")
        .field("id", |f| {
            f.required("Participant ID is required")
                .pattern(ID, "Participant ID must be alphanumeric with hyphens/underscores")
        })
        .field("status", |f| {
            f.one_of(
                &["confirmed", "waitlist", "cancelled", "attended", "no-show"],
                "Status must be a valid option",
            )
        })
        .field("notes", |f| f.max_length(1000, "Notes must not exceed 1000 characters"))
        .field("checkedIn", |f| f.boolean("Checked in must be a boolean"))
        .field("checkedInAt", |f| f.iso_date("Check in time must be a valid ISO 8601 date"))
        .build()
}

fn admin_update_talk() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("admin.updateTalk")
        .field("id", |f| {
            f.required("Talk ID is required")
                .pattern(ID, "Talk ID must be alphanumeric with hyphens/underscores")
        })
        .field("status", |f| {
            f.one_of(
                &["pending", "approved", "rejected", "scheduled"],
                "Status must be pending, approved, rejected, or scheduled",
            )
        })
        .field("scheduledTime", |f| f.pattern(TIME, "Scheduled time must be in HH:MM format"))
        .field("feedback", |f| f.max_length(1000, "Feedback must not exceed 1000 characters"))
        .field("rating", |f| f.float_range(Some(1.0), Some(5.0), "Rating must be between 1 and 5"))
        .build()
}

fn query_pagination() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("query.pagination")
        .field("page", |f| f.int_range(Some(1), Some(1000), "Page must be between 1 and 1000"))
        .field("limit", |f| f.int_range(Some(1), Some(100), "Limit must be between 1 and 100"))
        .field("sort", |f| {
            f.one_of(&["date", "name", "title", "createdAt", "updatedAt"], "Sort field must be valid")
        })
        .field("order", |f| f.one_of(&["asc", "desc"], "Order must be asc or desc"))
        .build()
}

fn query_search() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("query.search")
        .field("q", |f| f.length(1, 100, "Search query must be between 1 and 100 characters"))
        .field("category", |f| f.one_of(CATEGORIES, "Category filter must be valid"))
        .field("status", |f| {
            f.one_of(&["upcoming", "ongoing", "completed", "cancelled"], "Status filter must be valid")
        })
        .field("dateFrom", |f| f.iso_date("Date from must be a valid ISO 8601 date"))
        .field("dateTo", |f| f.iso_date("Date to must be a valid ISO 8601 date"))
        .build()
}

fn file_upload() -> Result<RuleSet, ConfigurationError> {
    RuleSet::builder("file.upload")
        .field("fileType", |f| {
            f.required("File type is required").one_of(
                &["image", "document", "presentation"],
                "File type must be image, document, or presentation",
            )
        })
        .field("fileName", |f| {
            f.required("File name is required")
                .length(1, 255, "File name must be between 1 and 255 characters")
                .pattern(FILE_NAME, "File name must have valid format")
                .custom("File type is not allowed for security reasons", |ctx| {
                    let name = ctx.text().unwrap_or_default().to_ascii_lowercase();
                    Ok(!SUSPICIOUS_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
                })
        })
        .field("fileSize", |f| {
            f.required("File size is required")
                .int_range(Some(1), Some(10_485_760), "File size must be between 1 byte and 10MB")
        })
        .build()
}

/// The field's own value as a date, `None` when absent or unparseable.
fn own_date(ctx: &CustomContext<'_>) -> Option<DateTime<Utc>> {
    ctx.text().and_then(|text| predicates::parse_iso8601(&text))
}

/// Another payload field as a date.
fn payload_date(ctx: &CustomContext<'_>, path: &str) -> Option<DateTime<Utc>> {
    ctx.field(path)
        .and_then(predicates::as_text)
        .and_then(|text| predicates::parse_iso8601(&text))
}

/// Blank values pass; anything else must be an http(s) URL.
fn optional_url(ctx: &CustomContext<'_>) -> Result<bool, crate::validation::error::RuleEvaluationError> {
    Ok(match ctx.value {
        None => true,
        Some(Value::String(s)) if s.trim().is_empty() => true,
        Some(value) => predicates::as_text(value).is_some_and(|text| predicates::is_http_url(&text)),
    })
}
