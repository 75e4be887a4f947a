pub mod ids;

pub use ids::{ActorId, CartId, CartLineId, ComboId, CustomerId, OrderId, StockUnitId, VariantId};
