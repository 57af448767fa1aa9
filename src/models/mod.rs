pub mod user;
pub mod apartment;
pub mod booked_apartment;
pub mod agreement;
pub mod announcement;
pub mod coupon;
pub mod payment;

pub use user::{NewUser, ProfileUpdate, Role, User};
pub use apartment::{Apartment, NewApartment};
pub use booked_apartment::{BookedApartment, NewBookedApartment};
pub use agreement::{AgreementRequest, AgreementStatus, AgreementUpdate, NewAgreementRequest};
pub use announcement::{Announcement, NewAnnouncement};
pub use coupon::{Coupon, NewCoupon};
pub use payment::{NewPayment, Payment};
