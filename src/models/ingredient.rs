use serde::{Deserialize, Serialize};

use crate::constants::{MAX_INGREDIENT_NAME_LENGTH, MAX_MEASUREMENT_UNIT_LENGTH};
use crate::error::{AppError, Result};

/// Ingredient reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient create payload (staff only)
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientCreate {
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient partial update payload (staff only)
#[derive(Debug, Default, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

impl IngredientCreate {
    pub fn validate(&self) -> Result<()> {
        validate_ingredient_name(&self.name)?;
        validate_measurement_unit(&self.measurement_unit)
    }
}

impl IngredientUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_ingredient_name(name)?;
        }
        if let Some(unit) = &self.measurement_unit {
            validate_measurement_unit(unit)?;
        }
        Ok(())
    }
}

fn validate_ingredient_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().count() > MAX_INGREDIENT_NAME_LENGTH {
        return Err(AppError::validation(
            "name",
            format!("Ingredient name must be 1 to {MAX_INGREDIENT_NAME_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn validate_measurement_unit(unit: &str) -> Result<()> {
    if unit.trim().is_empty() || unit.chars().count() > MAX_MEASUREMENT_UNIT_LENGTH {
        return Err(AppError::validation(
            "measurement_unit",
            format!("Measurement unit must be 1 to {MAX_MEASUREMENT_UNIT_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Parse one `name,unit` record of the ingredient reference file
///
/// Returns `Ok(None)` for blank lines. Fields follow CSV quoting: a field in
/// double quotes may contain commas, and `""` inside it stands for one quote.
/// Exactly two fields are required.
pub fn parse_reference_line(line: &str) -> std::result::Result<Option<IngredientCreate>, String> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let fields = split_csv_record(line)?;
    let [name, unit] = <[String; 2]>::try_from(fields)
        .map_err(|fields| format!("expected two columns: name,unit (got {})", fields.len()))?;

    let record = IngredientCreate {
        name: name.trim().to_string(),
        measurement_unit: unit.trim().to_string(),
    };
    record.validate().map_err(|e| e.to_string())?;

    Ok(Some(record))
}

fn split_csv_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();
    let mut fields = Vec::new();

    loop {
        let mut field = String::new();
        while chars.next_if_eq(&' ').is_some() {}

        let quoted = chars.next_if_eq(&'"').is_some();
        if quoted {
            loop {
                match chars.next() {
                    Some('"') if chars.next_if_eq(&'"').is_some() => field.push('"'),
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err("unterminated quoted field".to_string()),
                }
            }
            while chars.next_if_eq(&' ').is_some() {}
        }

        let mut more = false;
        for c in chars.by_ref() {
            match c {
                ',' => {
                    more = true;
                    break;
                }
                '"' => return Err("unexpected quote in unquoted field".to_string()),
                _ if quoted => return Err("unexpected text after quoted field".to_string()),
                _ => field.push(c),
            }
        }
        fields.push(field);

        if !more {
            return Ok(fields);
        }
    }
}
