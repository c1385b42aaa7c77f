//! Status message texts

pub const DATA_SAVED: &str = "Data has been saved successfully.";

pub const DATA_RETRIEVED: &str = "Data has been retrieved successfully.";

pub const NO_DATA: &str = "No data for the selection criteria.";

/// Text for a counter that produced no value
pub fn next_id_failed(table: &str, column: &str) -> String {
    format!("Get next Id for {}.{} failed to get next value.", table, column)
}
