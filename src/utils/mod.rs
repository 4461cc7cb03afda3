pub(crate) mod date;
pub(crate) mod timezone;

pub(crate) use date::{format_date_label, parse_date, parse_record_date};
pub(crate) use timezone::Timezone;
