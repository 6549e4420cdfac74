//! Faker rule catalog backed by the `fake` crate.

use fake::Fake;
use fake::faker::address::raw::{
    BuildingNumber, CityName, CountryName, StateName, StreetName, ZipCode,
};
use fake::faker::boolean::raw::Boolean;
use fake::faker::company::raw::{Buzzword, CatchPhrase, CompanyName, Industry};
use fake::faker::creditcard::raw::CreditCardNumber;
use fake::faker::currency::raw::CurrencyCode;
use fake::faker::internet::raw::{DomainSuffix, FreeEmail, IPv4, SafeEmail, Username};
use fake::faker::job::raw::Title as JobTitle;
use fake::faker::lorem::raw::{Paragraph, Sentence, Word};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::faker::number::raw::Digit;
use fake::faker::phone_number::raw::{CellNumber, PhoneNumber};
use fake::locales::{EN, PT_BR};
use rand::Rng;

use tablefill_core::FakerLocale;

// Each raw faker bounds its locale by its own generator trait, so the match
// is expanded once per concrete locale.
macro_rules! faker_value {
    ($id:expr, $locale:expr, $rng:expr) => {{
        let rng = $rng;
        let value: String = match $id {
            "address.building_number" => BuildingNumber($locale).fake_with_rng(rng),
            "address.city" => CityName($locale).fake_with_rng(rng),
            "address.country" => CountryName($locale).fake_with_rng(rng),
            "address.state" => StateName($locale).fake_with_rng(rng),
            "address.street_name" => StreetName($locale).fake_with_rng(rng),
            "address.zip_code" => ZipCode($locale).fake_with_rng(rng),
            "boolean" => {
                let value: bool = Boolean($locale, 50).fake_with_rng(rng);
                value.to_string()
            }
            "company.buzzword" => Buzzword($locale).fake_with_rng(rng),
            "company.catch_phrase" => CatchPhrase($locale).fake_with_rng(rng),
            "company.industry" => Industry($locale).fake_with_rng(rng),
            "company.name" => CompanyName($locale).fake_with_rng(rng),
            "finance.credit_card_number" => CreditCardNumber($locale).fake_with_rng(rng),
            "finance.currency_code" => CurrencyCode($locale).fake_with_rng(rng),
            "internet.domain_suffix" => DomainSuffix($locale).fake_with_rng(rng),
            "internet.free_email" => FreeEmail($locale).fake_with_rng(rng),
            "internet.ipv4" => IPv4($locale).fake_with_rng(rng),
            "internet.safe_email" => SafeEmail($locale).fake_with_rng(rng),
            "internet.username" => Username($locale).fake_with_rng(rng),
            "job.title" => JobTitle($locale).fake_with_rng(rng),
            "lorem.paragraph" => Paragraph($locale, 2..5).fake_with_rng(rng),
            "lorem.sentence" => Sentence($locale, 4..10).fake_with_rng(rng),
            "lorem.word" => Word($locale).fake_with_rng(rng),
            "name.first_name" => FirstName($locale).fake_with_rng(rng),
            "name.last_name" => LastName($locale).fake_with_rng(rng),
            "name.name" => Name($locale).fake_with_rng(rng),
            "number.digit" => Digit($locale).fake_with_rng(rng),
            "number.integer" => rng.random_range(1..=100_000_i64).to_string(),
            "phone.cell_number" => CellNumber($locale).fake_with_rng(rng),
            "phone.number" => PhoneNumber($locale).fake_with_rng(rng),
            "uuid.v4" => {
                let bytes: [u8; 16] = rng.random();
                uuid::Builder::from_random_bytes(bytes)
                    .into_uuid()
                    .to_string()
            }
            _ => return None,
        };
        Some(value)
    }};
}

/// Canonical rule ids, sorted.
pub const RULE_IDS: &[&str] = &[
    "address.building_number",
    "address.city",
    "address.country",
    "address.state",
    "address.street_name",
    "address.zip_code",
    "boolean",
    "company.buzzword",
    "company.catch_phrase",
    "company.industry",
    "company.name",
    "finance.credit_card_number",
    "finance.currency_code",
    "internet.domain_suffix",
    "internet.free_email",
    "internet.ipv4",
    "internet.safe_email",
    "internet.username",
    "job.title",
    "lorem.paragraph",
    "lorem.sentence",
    "lorem.word",
    "name.first_name",
    "name.last_name",
    "name.name",
    "number.digit",
    "number.integer",
    "phone.cell_number",
    "phone.number",
    "uuid.v4",
];

/// Alternate spellings accepted for canonical ids.
const ALIASES: &[(&str, &str)] = &[
    ("company.companyName", "company.name"),
    ("datatype.boolean", "boolean"),
    ("internet.email", "internet.free_email"),
    ("internet.userName", "internet.username"),
    ("location.city", "address.city"),
    ("location.country", "address.country"),
    ("location.state", "address.state"),
    ("location.street", "address.street_name"),
    ("location.zipCode", "address.zip_code"),
    ("person.firstName", "name.first_name"),
    ("person.fullName", "name.name"),
    ("person.jobTitle", "job.title"),
    ("person.lastName", "name.last_name"),
    ("phone.phoneNumber", "phone.number"),
    ("string.uuid", "uuid.v4"),
];

/// Map a rule id (canonical or alias) to its canonical id.
pub fn resolve(rule: &str) -> Option<&'static str> {
    if let Some(id) = RULE_IDS.iter().copied().find(|id| *id == rule) {
        return Some(id);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == rule)
        .map(|(_, target)| *target)
}

/// Produce one value for a canonical rule id.
pub fn generate<R: Rng + ?Sized>(id: &str, locale: FakerLocale, rng: &mut R) -> Option<String> {
    match locale {
        FakerLocale::EnUs => faker_value!(id, EN, rng),
        FakerLocale::PtBr => faker_value!(id, PT_BR, rng),
    }
}
