mod dashboard;
mod detail;
mod format;
mod list;

pub(crate) use dashboard::{output_dashboard_json, render_dashboard};
pub(crate) use detail::{output_detail_json, render_detail};
pub(crate) use list::{output_list_csv, output_list_json, print_list_table};
