use shared_types::BlockHeader;

use crate::config::MAX_EXTRA_DATA_SIZE;
use crate::domain::HeaderError;

/// Stateless structural checks of a header against its parent.
pub struct HeaderValidator;

impl HeaderValidator {
    /// Run every structural check.
    pub fn validate(
        header: &BlockHeader,
        parent: &BlockHeader,
        now: u64,
        max_drift_secs: u64,
    ) -> Result<(), HeaderError> {
        Self::validate_parent(header, parent)?;
        Self::validate_number(header, parent)?;
        Self::validate_timestamp(header, parent, now, max_drift_secs)?;
        Self::validate_gas(header)?;
        Self::validate_extra_data(header)
    }

    /// Validate parent linkage
    pub fn validate_parent(header: &BlockHeader, parent: &BlockHeader) -> Result<(), HeaderError> {
        if header.parent_hash != parent.hash() {
            return Err(HeaderError::UnknownParent(header.parent_hash));
        }
        Ok(())
    }

    /// Validate sequential number
    pub fn validate_number(header: &BlockHeader, parent: &BlockHeader) -> Result<(), HeaderError> {
        let expected = parent.number + 1;
        if header.number != expected {
            return Err(HeaderError::InvalidNumber {
                expected,
                actual: header.number,
            });
        }
        Ok(())
    }

    /// Validate timestamp ordering
    ///
    /// Timestamps may repeat the parent's but never go backwards.
    pub fn validate_timestamp(
        header: &BlockHeader,
        parent: &BlockHeader,
        now: u64,
        max_drift_secs: u64,
    ) -> Result<(), HeaderError> {
        if header.timestamp > now.saturating_add(max_drift_secs) {
            return Err(HeaderError::FutureTimestamp {
                timestamp: header.timestamp,
                current: now,
            });
        }
        if header.timestamp < parent.timestamp {
            return Err(HeaderError::InvalidTimestamp {
                block: header.timestamp,
                parent: parent.timestamp,
            });
        }
        Ok(())
    }

    /// Validate gas used against gas limit
    pub fn validate_gas(header: &BlockHeader) -> Result<(), HeaderError> {
        if header.gas_used > header.gas_limit {
            return Err(HeaderError::GasLimitExceeded {
                used: header.gas_used,
                limit: header.gas_limit,
            });
        }
        Ok(())
    }

    /// Validate extra data size
    pub fn validate_extra_data(header: &BlockHeader) -> Result<(), HeaderError> {
        if header.extra_data.len() > MAX_EXTRA_DATA_SIZE {
            return Err(HeaderError::ExtraDataTooLarge {
                size: header.extra_data.len(),
                limit: MAX_EXTRA_DATA_SIZE,
            });
        }
        Ok(())
    }
}
