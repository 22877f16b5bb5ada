//! Session Cart
//!
//! 购物车只存在于会话中，结算成功或登出时整体丢弃；
//! 在成功下单之前不落库。

use serde::{Deserialize, Serialize};
use shared::models::Book;

/// One cart line. Title/price/image are snapshots taken when the item
/// was added; checkout re-reads nothing but the quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub book_id: i64,
    pub title: String,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub image_url: Option<String>,
    pub quantity: i64,
}

impl CartItem {
    /// 有折扣价时以折扣价为准
    pub fn current_price(&self) -> f64 {
        self.discount_price.unwrap_or(self.price)
    }

    pub fn line_total(&self) -> f64 {
        self.current_price() * self.quantity as f64
    }
}

/// Per-session cart with coupon state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub coupon_code: Option<String>,
    pub discount_amount: f64,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// 折扣前小计
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    /// 应付金额（不含运费），折扣不会把金额打成负数
    pub fn final_total(&self) -> f64 {
        (self.subtotal() - self.discount_amount).max(0.0)
    }

    /// Add a book; merges quantity when the line already exists.
    pub fn add_book(&mut self, book: &Book, image_url: Option<String>, quantity: i64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.book_id == book.id) {
            item.quantity += quantity;
        } else {
            self.items.push(CartItem {
                book_id: book.id,
                title: book.title.clone(),
                price: book.price,
                discount_price: book.discount_price,
                image_url,
                quantity,
            });
        }
    }

    /// Set a line's quantity; `quantity <= 0` removes the line.
    pub fn update_quantity(&mut self, book_id: i64, quantity: i64) {
        if quantity <= 0 {
            self.remove(book_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.book_id == book_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, book_id: i64) {
        self.items.retain(|i| i.book_id != book_id);
    }

    pub fn apply_coupon(&mut self, code: &str, discount: f64) {
        self.coupon_code = Some(code.to_string());
        self.discount_amount = discount;
    }

    pub fn remove_coupon(&mut self) {
        self.coupon_code = None;
        self.discount_amount = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, price: f64, discount: Option<f64>) -> Book {
        Book {
            id,
            title: format!("book-{id}"),
            isbn: None,
            price,
            discount_price: discount,
            description: None,
            publish_year: None,
            page_count: None,
            cover_type: None,
            stock_quantity: 10,
            sold_quantity: 0,
            publisher_id: None,
            status: "Active".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn add_merges_quantities() {
        let mut cart = Cart::default();
        let b = book(1, 100.0, None);
        cart.add_book(&b, None, 1);
        cart.add_book(&b, None, 2);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.subtotal(), 300.0);
    }

    #[test]
    fn discount_price_wins() {
        let mut cart = Cart::default();
        cart.add_book(&book(1, 100.0, Some(80.0)), None, 2);
        assert_eq!(cart.subtotal(), 160.0);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::default();
        cart.add_book(&book(1, 100.0, None), None, 1);
        cart.update_quantity(1, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn coupon_never_goes_negative() {
        let mut cart = Cart::default();
        cart.add_book(&book(1, 50.0, None), None, 1);
        cart.apply_coupon("BIG", 500.0);
        assert_eq!(cart.final_total(), 0.0);
        cart.remove_coupon();
        assert_eq!(cart.final_total(), 50.0);
        assert!(cart.coupon_code.is_none());
    }
}
