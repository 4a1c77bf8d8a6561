//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Accounts owning devices.
    ///
    /// Only `id` and `login` are touched by the sync pipeline; the remaining
    /// columns belong to account management and keep their defaults for
    /// service accounts created on demand.
    accounts (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login name.
        login -> Text,
        /// Credential hash; absent for service accounts.
        credential -> Nullable<Text>,
        /// `active` or `disabled`.
        status -> Text,
        /// Administrator flag.
        is_admin -> Bool,
        /// Number of devices the account may register.
        device_quota -> Int4,
        /// Optional expiry.
        expires_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Registered devices keyed by their external identifier.
    devices (device_id) {
        /// External identifier chosen by the device.
        device_id -> Text,
        /// Display name.
        name -> Text,
        /// Owning account.
        account_id -> Uuid,
        /// Most recent sync.
        last_contact_at -> Timestamptz,
        /// First registration.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only device location log.
    location_samples (id) {
        /// Surrogate key.
        id -> Int8,
        /// Reporting device.
        device_id -> Text,
        /// Latitude in degrees.
        latitude -> Float8,
        /// Longitude in degrees.
        longitude -> Float8,
        /// Device capture time, or receipt time when absent.
        captured_at -> Timestamptz,
        /// Server receipt time.
        received_at -> Timestamptz,
    }
}

diesel::table! {
    /// Sale headers keyed by document number.
    sale_headers (number) {
        number -> Text,
        account_id -> Uuid,
        device_id -> Text,
        client_code -> Nullable<Text>,
        issued_on -> Nullable<Date>,
        issued_at_time -> Nullable<Time>,
        total_excl_tax -> Float8,
        total_tax -> Float8,
        stamp_duty -> Float8,
        discount -> Float8,
        amount_paid -> Float8,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        delivered -> Bool,
        exported_sale -> Bool,
        blocked -> Bool,
        is_imported -> Bool,
        is_exported -> Bool,
        /// Generation the current line set was written under.
        line_generation -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Sale line items. Only rows whose generation matches the header are
    /// live; older generations are deleted in the same transaction.
    sale_lines (document_number, generation, line_number) {
        document_number -> Text,
        generation -> Int8,
        line_number -> Int4,
        barcode -> Nullable<Text>,
        product -> Nullable<Text>,
        package_count -> Float8,
        package_size -> Float8,
        quantity -> Float8,
        free_quantity -> Float8,
        unit_price_excl_tax -> Float8,
        unit_cost_excl_tax -> Float8,
        tax_rate -> Float8,
        depot_code -> Nullable<Text>,
        device_record_id -> Nullable<Text>,
    }
}

diesel::table! {
    /// Order headers keyed by document number.
    order_headers (number) {
        number -> Text,
        account_id -> Uuid,
        device_id -> Text,
        client_code -> Nullable<Text>,
        issued_on -> Nullable<Date>,
        issued_at_time -> Nullable<Time>,
        total_excl_tax -> Float8,
        total_tax -> Float8,
        stamp_duty -> Float8,
        discount -> Float8,
        amount_paid -> Float8,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        delivered -> Bool,
        exported_sale -> Bool,
        blocked -> Bool,
        is_imported -> Bool,
        is_exported -> Bool,
        line_generation -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Order line items, generation-scoped like `sale_lines`.
    order_lines (document_number, generation, line_number) {
        document_number -> Text,
        generation -> Int8,
        line_number -> Int4,
        barcode -> Nullable<Text>,
        product -> Nullable<Text>,
        package_count -> Float8,
        package_size -> Float8,
        quantity -> Float8,
        free_quantity -> Float8,
        unit_price_excl_tax -> Float8,
        unit_cost_excl_tax -> Float8,
        tax_rate -> Float8,
        depot_code -> Nullable<Text>,
        device_record_id -> Nullable<Text>,
    }
}

diesel::joinable!(devices -> accounts (account_id));
diesel::joinable!(location_samples -> devices (device_id));
diesel::joinable!(sale_headers -> devices (device_id));
diesel::joinable!(order_headers -> devices (device_id));
diesel::joinable!(sale_lines -> sale_headers (document_number));
diesel::joinable!(order_lines -> order_headers (document_number));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    devices,
    location_samples,
    sale_headers,
    sale_lines,
    order_headers,
    order_lines,
);
