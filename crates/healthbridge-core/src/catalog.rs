//! Static catalog: bookable doctors and pharmacy stock.

use crate::model::{Doctor, PharmacyProduct, ProductCategory};

/// National emergency number dialled from the floating emergency action.
pub const EMERGENCY_NUMBER: &str = "112";

pub const EMERGENCY_PROMPT: &str =
    "Dialing Emergency Services (112)? This will also alert your emergency contacts.";

pub fn doctors() -> Vec<Doctor> {
    vec![
        Doctor {
            id: "1".into(),
            name: "Dr. Sarah Molefe".into(),
            specialty: "General Practitioner".into(),
            location: "Soweto, Johannesburg".into(),
            rating: 4.8,
            consultation_fee: 450,
            image: "https://picsum.photos/seed/doc1/200/200".into(),
            availability: slots(&["09:00", "11:30", "14:00", "16:00"]),
        },
        Doctor {
            id: "2".into(),
            name: "Dr. Johan Pretorius".into(),
            specialty: "Pediatrician".into(),
            location: "Pretoria East".into(),
            rating: 4.9,
            consultation_fee: 650,
            image: "https://picsum.photos/seed/doc2/200/200".into(),
            availability: slots(&["10:00", "12:00", "15:30"]),
        },
        Doctor {
            id: "3".into(),
            name: "Dr. Amina Pillay".into(),
            specialty: "Dermatologist".into(),
            location: "Durban North".into(),
            rating: 4.7,
            consultation_fee: 550,
            image: "https://picsum.photos/seed/doc3/200/200".into(),
            availability: slots(&["08:30", "13:00", "16:30"]),
        },
    ]
}

pub fn pharmacy_items() -> Vec<PharmacyProduct> {
    vec![
        PharmacyProduct {
            id: "p1".into(),
            name: "Panado Tablets 24s".into(),
            category: ProductCategory::OverTheCounter,
            price: 45.00,
            image: "https://picsum.photos/seed/med1/200/200".into(),
            description: "Relief of mild to moderate pain and fever.".into(),
        },
        PharmacyProduct {
            id: "p2".into(),
            name: "Multivitamin Complex".into(),
            category: ProductCategory::Supplement,
            price: 185.50,
            image: "https://picsum.photos/seed/med2/200/200".into(),
            description: "Daily support for immune health and energy.".into(),
        },
        PharmacyProduct {
            id: "p3".into(),
            name: "Hypertension Support Plus".into(),
            category: ProductCategory::Prescription,
            price: 320.00,
            image: "https://picsum.photos/seed/med3/200/200".into(),
            description: "Requires a valid prescription from a registered practitioner.".into(),
        },
    ]
}

fn slots(s: &[&str]) -> Vec<String> {
    s.iter().map(|x| x.to_string()).collect()
}
