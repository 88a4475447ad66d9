//! Domain models shared between the server and its clients

pub mod dining_table;
pub mod employee;
pub mod menu_item;
pub mod order;
pub mod payment;

pub use dining_table::{DiningTable, DiningTableCreate, DiningTableUpdate};
pub use employee::{Employee, EmployeeCreate};
pub use menu_item::{MenuItem, MenuItemCreate, MenuItemUpdate};
pub use order::{
    Order, OrderCreate, OrderDetail, OrderItemInput, OrderItemView, OrderPaymentStatus,
    OrderStatus, OrderView,
};
pub use payment::{Payment, PaymentState};
