diesel::table! {
    users (id) {
        id -> BigInt,
        firebase_uid -> Text,
        email -> Text,
        full_name -> Nullable<Text>,
        role -> Text,
        is_active -> Bool,
        created_at -> BigInt,
    }
}

diesel::table! {
    hospitals (id) {
        id -> BigInt,
        name -> Text,
        address -> Text,
        lat -> Double,
        lng -> Double,
        distance -> Nullable<Double>,
        rating -> Nullable<Double>,
        reviews -> Nullable<Text>,
        lookup_key -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, hospitals);
