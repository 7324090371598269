// Date/text formatting shared by the preview, the PDF exporter and the DOCX exporter.
// Everything here is pure: identical input always yields identical output.

pub mod bullets;
pub mod dates;

pub use bullets::{split_into_bullets, strip_bullet_markers};
pub use dates::{format_date_range, format_month_year, is_valid_month_year, MonthYear};
