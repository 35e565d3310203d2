//! Register checkout: cart, session state machine and receipts.

mod cart;
mod receipt;
mod session;

pub use cart::{AddOutcome, Cart, CartLine, MAX_QUANTITY_PER_ITEM};
pub use receipt::{Compensation, FailedLine, PartialCheckout, Receipt, ReceiptLine};
pub use session::{CheckoutSession, CheckoutState, PaymentSelection};
