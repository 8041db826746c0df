//! Declarative helper for driven-port error enums.
//!
//! Each variant gets a `thiserror` message and a snake-case constructor whose
//! parameters accept `impl Into<_>`, so adapters can write
//! `BorrowRequestRepositoryError::query("timeout")`.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        ::paste::paste! {
            impl $name {
                $(
                    #[doc = concat!("Build [`", stringify!($name), "::", stringify!($variant), "`].")]
                    pub fn [<$variant:snake>]($( $($field: impl Into<$ty>),* )?) -> Self {
                        Self::$variant $( { $($field: $field.into()),* } )?
                    }
                )*
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum LedgerError {
            Offline => "ledger offline",
            Rejected { reason: String } => "rejected: {reason}",
            Throttled { reason: String, retry_after: u32 } => "{reason}; retry in {retry_after}s",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(LedgerError::offline(), LedgerError::Offline);
        assert_eq!(LedgerError::offline().to_string(), "ledger offline");
    }

    #[test]
    fn string_fields_accept_str() {
        assert_eq!(LedgerError::rejected("no").to_string(), "rejected: no");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = LedgerError::throttled("slow down", 5_u32);
        assert_eq!(err.to_string(), "slow down; retry in 5s");
    }
}
