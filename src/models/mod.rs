pub mod booking;
pub mod carousel;
pub mod event;
pub mod payment;
pub mod profile;
pub mod setting;
pub mod subscription;

pub use booking::{Booking, BookingDetails, BookingStatus, BookingSummary, NewBooking, PaymentStatus, UserBooking};
pub use carousel::CarouselSlide;
pub use event::{Event, EventStatus};
pub use payment::{NewPayment, Payment};
pub use profile::{Profile, Role};
pub use setting::SiteSetting;
pub use subscription::{PlanType, Subscription};
