//! Validation utilities for the inventory platform

// ============================================================================
// Stock Validations
// ============================================================================

/// Validate a movement or transfer quantity (strictly positive)
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a physically counted quantity (zero allowed)
pub fn validate_counted_quantity(counted: i64) -> Result<(), &'static str> {
    if counted < 0 {
        return Err("Counted quantity cannot be negative");
    }
    Ok(())
}

/// Validate a signed adjustment delta (non-zero)
pub fn validate_adjustment_delta(delta: i64) -> Result<(), &'static str> {
    if delta == 0 {
        return Err("Adjustment quantity cannot be zero");
    }
    Ok(())
}

/// Validate a minimum-stock threshold
pub fn validate_min_stock(min_stock: i64) -> Result<(), &'static str> {
    if min_stock < 0 {
        return Err("Minimum stock cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate warehouse code format (2-20 uppercase alphanumeric, dashes allowed)
pub fn validate_warehouse_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Warehouse code must be at least 2 characters");
    }
    if code.len() > 20 {
        return Err("Warehouse code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Warehouse code must be uppercase alphanumeric or '-'");
    }
    if code.starts_with('-') || code.ends_with('-') {
        return Err("Warehouse code cannot start or end with '-'");
    }
    Ok(())
}

/// Validate SKU format (non-empty, no whitespace, at most 50 characters)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() {
        return Err("SKU cannot be empty");
    }
    if sku.len() > 50 {
        return Err("SKU must be at most 50 characters");
    }
    if sku.chars().any(char::is_whitespace) {
        return Err("SKU cannot contain whitespace");
    }
    Ok(())
}

/// Validate a display name (non-blank, at most 100 characters)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate a free-text movement note
pub fn validate_note(note: &str) -> Result<(), &'static str> {
    if note.chars().count() > 500 {
        return Err("Note must be at most 500 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-4).is_err());
    }

    #[test]
    fn test_validate_counted_quantity() {
        assert!(validate_counted_quantity(0).is_ok());
        assert!(validate_counted_quantity(12).is_ok());
        assert!(validate_counted_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_adjustment_delta() {
        assert!(validate_adjustment_delta(-3).is_ok());
        assert!(validate_adjustment_delta(3).is_ok());
        assert!(validate_adjustment_delta(0).is_err());
    }

    #[test]
    fn test_validate_warehouse_code_valid() {
        assert!(validate_warehouse_code("BOD-01").is_ok());
        assert!(validate_warehouse_code("CENTRAL").is_ok());
        assert!(validate_warehouse_code("B2").is_ok());
    }

    #[test]
    fn test_validate_warehouse_code_invalid() {
        assert!(validate_warehouse_code("B").is_err()); // Too short
        assert!(validate_warehouse_code("bod-01").is_err()); // Lowercase
        assert!(validate_warehouse_code("BOD 01").is_err()); // Space
        assert!(validate_warehouse_code("-BOD").is_err());
        assert!(validate_warehouse_code("ABCDEFGHIJKLMNOPQRSTU").is_err()); // Too long
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("ELEC-TV-0001").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("ELEC TV").is_err());
    }

    #[test]
    fn test_validate_name_and_note() {
        assert!(validate_name("Bodega Central").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_note("").is_ok());
        assert!(validate_note(&"x".repeat(501)).is_err());
    }
}
