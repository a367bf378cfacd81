//! Constants used throughout the ward core crate.
//!
//! Collection names, serial formats and the option lists the admission form offers.

/// Default collection holding the live census of admitted patients.
pub const DEFAULT_CENSUS_COLLECTION: &str = "patients";

/// Default collection holding archived (deceased) patient records.
pub const DEFAULT_MORTALITY_COLLECTION: &str = "mortality_records";

/// Default directory for the file-backed document store.
pub const DEFAULT_DATA_DIR: &str = "ward_data";

/// File extension for documents written by the file-backed store.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// Minimum zero-padded width of a serial number.
pub const SERIAL_WIDTH: usize = 3;

/// Prefix carried by mortality archive serial numbers (`M-001`).
pub const MORTALITY_SERIAL_PREFIX: &str = "M-";

/// Document field holding the record's clinical unit; used for equality queries.
pub const UNIT_FIELD: &str = "unit";

/// Document field mirroring the document key.
pub const ID_FIELD: &str = "id";

/// Bed/location values offered by the admission form. Other values are accepted.
pub const KNOWN_LOCATIONS: &[&str] = &["OT", "WARD", "ICU", "ER", "Pvt Ward"];

/// Consultant roster offered as suggestions. Other names are accepted.
pub const KNOWN_CONSULTANTS: &[&str] = &[
    "Dr. Salman Khalid",
    "Dr. Ruqaya",
    "Dr. Kiran Nasir",
    "Dr. Bilal",
    "Dr. Shoaib",
    "Dr. Murtaza",
    "Dr. Raheela",
    "Dr. Aysha",
    "Dr. Shakeel",
    "Dr. Zohaib",
    "Dr. Shariq",
];

/// Column headers for census and mortality exports, in column order.
pub const EXPORT_HEADERS: [&str; 10] = [
    "S.No",
    "Reg No",
    "Patient Name",
    "Gender",
    "Category",
    "Code",
    "Consultant",
    "In-Date",
    "Out-Date",
    "LOS",
];
