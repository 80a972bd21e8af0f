pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_contract {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_contract(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_contract(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        contract_violation(name, condition)
    }
}

#[cold]
pub fn contract_violation(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::ContractViolation {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}
