//! Collaborators around the engine: CORS, bot checks and lead delivery.
//! None of them can influence a computed result.

mod captcha;
mod cors;
mod leads;

pub use captcha::{CaptchaError, CaptchaVerifier, DisabledCaptcha, StaticTokenVerifier};
pub use cors::CorsPolicy;
pub use leads::{
    ContactInfo, InMemoryLeadSink, Lead, LeadError, LeadSink, LogLeadSink, SourceMetadata,
    format_brl, format_pct,
};
