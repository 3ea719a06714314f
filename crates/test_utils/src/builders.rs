//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults, so
//! tests only spell out the fields they actually care about.

use chrono::{DateTime, Days, NaiveDate, Utc};
use core_kernel::{AccountId, BuyerId, Money, ProductId, Rate, ValidityWindow};
use domain_purchase::{
    Buyer, BuyerKind, Payment, PaymentDetails, PaymentMethod, PaymentStatus, Product,
    ProductCategory, Purchase, PurchaseKind, PurchaseStatus, Voucher, VoucherBatch,
};
use rust_decimal_macros::dec;

use crate::fixtures::MoneyFixtures;

/// Builder for catalog products
pub struct TestProductBuilder {
    description: String,
    category: ProductCategory,
    price: Money,
    sold_until: DateTime<Utc>,
    variable_price: bool,
    voucher_audience: Option<BuyerKind>,
}

impl Default for TestProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProductBuilder {
    pub fn new() -> Self {
        Self {
            description: "Conference seat".to_string(),
            category: ProductCategory::General,
            price: MoneyFixtures::seat_price(),
            sold_until: Utc::now().checked_add_days(Days::new(30)).unwrap(),
            variable_price: false,
            voucher_audience: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = price;
        self
    }

    pub fn sold_until(mut self, deadline: DateTime<Utc>) -> Self {
        self.sold_until = deadline;
        self
    }

    pub fn off_sale(mut self) -> Self {
        self.sold_until = Utc::now().checked_sub_days(Days::new(1)).unwrap();
        self
    }

    pub fn variable_price(mut self) -> Self {
        self.variable_price = true;
        self
    }

    pub fn with_voucher_audience(mut self, audience: BuyerKind) -> Self {
        self.voucher_audience = Some(audience);
        self
    }

    pub fn build(self) -> Product {
        let mut product = Product::new(self.description, self.category, self.price, self.sold_until);
        product.variable_price = self.variable_price;
        product.voucher_audience = self.voucher_audience;
        product
    }
}

/// Builder for purchases
pub struct TestPurchaseBuilder {
    product_id: ProductId,
    customer_id: AccountId,
    buyer_id: BuyerId,
    kind: PurchaseKind,
    status: PurchaseStatus,
    unit_price: Money,
    quantity: u32,
}

impl Default for TestPurchaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPurchaseBuilder {
    pub fn new() -> Self {
        Self {
            product_id: ProductId::new(),
            customer_id: AccountId::new(),
            buyer_id: BuyerId::new(),
            kind: PurchaseKind::Single,
            status: PurchaseStatus::Pending,
            unit_price: MoneyFixtures::seat_price(),
            quantity: 1,
        }
    }

    /// Ties the purchase to a product's id and price
    pub fn for_product(mut self, product: &Product) -> Self {
        self.product_id = product.id;
        self.unit_price = product.price;
        self
    }

    pub fn with_kind(mut self, kind: PurchaseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: PurchaseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn build(self) -> Purchase {
        let mut purchase = Purchase::new(
            self.product_id,
            self.customer_id,
            self.buyer_id,
            self.kind,
            self.unit_price,
            self.quantity,
        );
        purchase.status = self.status;
        purchase
    }
}

/// Builder for payments
pub struct TestPaymentBuilder {
    purchase_id: Option<core_kernel::PurchaseId>,
    method: PaymentMethod,
    status: PaymentStatus,
    amount: Money,
    details: PaymentDetails,
    due_date: Option<NaiveDate>,
}

impl Default for TestPaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPaymentBuilder {
    pub fn new() -> Self {
        Self {
            purchase_id: None,
            method: PaymentMethod::Cash,
            status: PaymentStatus::Pending,
            amount: MoneyFixtures::seat_price(),
            details: PaymentDetails::Cash {},
            due_date: None,
        }
    }

    pub fn for_purchase(mut self, purchase: &Purchase) -> Self {
        self.purchase_id = Some(purchase.id);
        self.amount = purchase.total_owed();
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    /// Turns the payment into a bank slip with the given reference
    pub fn as_bank_slip(mut self, our_number: impl Into<String>, legal_due_date: NaiveDate) -> Self {
        self.method = PaymentMethod::BankSlip;
        self.details = PaymentDetails::BankSlip {
            our_number: our_number.into(),
            document_hash: "feedface".to_string(),
            legal_due_date,
        };
        self.due_date = Some(legal_due_date);
        self
    }

    pub fn build(self) -> Payment {
        let purchase_id = self.purchase_id.unwrap_or_else(core_kernel::PurchaseId::new);
        let mut payment = Payment::new(purchase_id, self.method, self.amount, self.details);
        payment.status = self.status;
        payment.due_date = self.due_date;
        payment
    }
}

/// Builder for buyers
pub struct TestBuyerBuilder {
    kind: BuyerKind,
    name: String,
    document: Option<String>,
}

impl Default for TestBuyerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBuyerBuilder {
    pub fn new() -> Self {
        Self {
            kind: BuyerKind::Person,
            name: "Ada Lovelace".to_string(),
            document: Some("12345678900".to_string()),
        }
    }

    pub fn with_kind(mut self, kind: BuyerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn without_document(mut self) -> Self {
        self.document = None;
        self
    }

    pub fn build(self) -> Buyer {
        let buyer = Buyer::new(self.kind, self.name);
        match self.document {
            Some(document) => buyer.with_document(document),
            None => buyer,
        }
    }
}

/// Builds a batch of vouchers valid around today
pub fn voucher_batch_for(product: &Product, discount: Rate, quantity: u32) -> Vec<Voucher> {
    let today = Utc::now().date_naive();
    let window = ValidityWindow::new(
        today.checked_sub_days(Days::new(1)).unwrap(),
        today.checked_add_days(Days::new(30)).unwrap(),
    )
    .unwrap();
    let batch = VoucherBatch {
        description: "Test vouchers".to_string(),
        discount,
        product_id: product.id,
        window,
        hash_code: Some("PC-TEST".to_string()),
    };
    batch.issue(quantity, AccountId::new())
}

/// A full-discount batch of one voucher
pub fn full_discount_voucher(product: &Product) -> Voucher {
    voucher_batch_for(product, Rate::full(), 1).remove(0)
}

/// A fractional-discount batch of one voucher
pub fn partial_discount_voucher(product: &Product) -> Voucher {
    voucher_batch_for(product, Rate::new(dec!(0.5)), 1).remove(0)
}
