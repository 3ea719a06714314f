use core_kernel::CoreError;
use thiserror::Error;

/// Domain errors for the purchase ledger
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The purchase is already fully paid; no further payments may be opened
    #[error("Purchase is already satisfied")]
    AlreadySatisfied,

    /// The purchase is stale and cannot accept payments
    #[error("Purchase is stale")]
    PurchaseIsStale,

    /// The product is no longer on sale
    #[error("Sales for this product are closed")]
    SalesClosed,

    /// The buyer category requires a document that was not supplied
    #[error("Buyer document is required but not defined")]
    DocumentNotDefined,

    /// The product's eligibility rule rejects this buyer
    #[error("Buyer is not eligible for this product")]
    IneligibleBuyer,

    /// A variable-price amount fell below the product floor
    #[error("Amount {given} is below the minimum of {minimum}")]
    BelowMinimumAmount { given: String, minimum: String },

    /// The payment method string is not recognised
    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),

    /// No redeemable voucher carries this hash code
    #[error("Invalid voucher hash code: {0}")]
    InvalidHashCode(String),

    /// Every voucher under this hash code has been consumed
    #[error("Voucher {0} has already been used")]
    VoucherAlreadyUsed(String),

    /// Error from core kernel types
    #[error(transparent)]
    Core(#[from] CoreError),
}
