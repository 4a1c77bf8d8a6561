//! Header and line writers for the sale and order document tables.
//!
//! Both families share one column layout, so the row structs and statements
//! are generated once per table pair.

/// Lines inserted per statement; keeps bind parameters well under the
/// PostgreSQL limit.
const LINE_INSERT_CHUNK: usize = 1_000;

/// Generate a module with the upsert and line replacement statements for one
/// header/line table pair.
///
/// The generated module exposes:
/// - `upsert_header`: a single `INSERT .. ON CONFLICT (number) DO UPDATE`
///   that overwrites every header column and bumps `line_generation`,
///   returning the new generation. Fresh rows start at generation 1.
/// - `replace_lines`: inserts the new line set under a generation and then
///   deletes every line of the document from other generations.
macro_rules! document_tables {
    ($(
        $module:ident {
            headers: $headers:ident,
            lines: $lines:ident $(,)?
        }
    ),+ $(,)?) => {
        $(
            pub(crate) mod $module {
                use chrono::{NaiveDate, NaiveTime};
                use diesel::prelude::*;
                use diesel::upsert::excluded;
                use diesel_async::{AsyncPgConnection, RunQueryDsl};
                use uuid::Uuid;

                use crate::domain::{Device, DocumentHeader, DocumentLine, DocumentNumber};
                use crate::outbound::persistence::schema::{$headers, $lines};

                use super::LINE_INSERT_CHUNK;

                #[derive(Debug, Insertable)]
                #[diesel(table_name = $headers)]
                struct HeaderRow<'a> {
                    number: &'a str,
                    account_id: Uuid,
                    device_id: &'a str,
                    client_code: Option<&'a str>,
                    issued_on: Option<NaiveDate>,
                    issued_at_time: Option<NaiveTime>,
                    total_excl_tax: f64,
                    total_tax: f64,
                    stamp_duty: f64,
                    discount: f64,
                    amount_paid: f64,
                    latitude: Option<f64>,
                    longitude: Option<f64>,
                    delivered: bool,
                    exported_sale: bool,
                    blocked: bool,
                    is_imported: bool,
                    is_exported: bool,
                    line_generation: i64,
                }

                impl<'a> HeaderRow<'a> {
                    fn new(header: &'a DocumentHeader, device: &'a Device) -> Self {
                        Self {
                            number: header.number.as_str(),
                            account_id: *device.owner.as_uuid(),
                            device_id: device.id.as_str(),
                            client_code: header.client_code.as_deref(),
                            issued_on: header.issued_on,
                            issued_at_time: header.issued_at_time,
                            total_excl_tax: header.totals.excl_tax,
                            total_tax: header.totals.tax,
                            stamp_duty: header.totals.stamp_duty,
                            discount: header.totals.discount,
                            amount_paid: header.totals.amount_paid,
                            latitude: header.latitude,
                            longitude: header.longitude,
                            delivered: header.flags.delivered,
                            exported_sale: header.flags.exported_sale,
                            blocked: header.flags.blocked,
                            is_imported: header.flags.is_imported,
                            is_exported: header.flags.is_exported,
                            line_generation: 1,
                        }
                    }
                }

                #[derive(Debug, Insertable)]
                #[diesel(table_name = $lines)]
                struct LineRow<'a> {
                    document_number: &'a str,
                    generation: i64,
                    line_number: i32,
                    barcode: Option<&'a str>,
                    product: Option<&'a str>,
                    package_count: f64,
                    package_size: f64,
                    quantity: f64,
                    free_quantity: f64,
                    unit_price_excl_tax: f64,
                    unit_cost_excl_tax: f64,
                    tax_rate: f64,
                    depot_code: Option<&'a str>,
                    device_record_id: Option<&'a str>,
                }

                impl<'a> LineRow<'a> {
                    fn new(
                        number: &'a DocumentNumber,
                        generation: i64,
                        line_number: i32,
                        line: &'a DocumentLine,
                    ) -> Self {
                        Self {
                            document_number: number.as_str(),
                            generation,
                            line_number,
                            barcode: line.barcode.as_deref(),
                            product: line.product.as_deref(),
                            package_count: line.package_count,
                            package_size: line.package_size,
                            quantity: line.quantity,
                            free_quantity: line.free_quantity,
                            unit_price_excl_tax: line.unit_price_excl_tax,
                            unit_cost_excl_tax: line.unit_cost_excl_tax,
                            tax_rate: line.tax_rate,
                            depot_code: line.depot_code.as_deref(),
                            device_record_id: line.device_record_id.as_deref(),
                        }
                    }
                }

                /// Insert or overwrite the header and return its new line
                /// generation.
                pub(crate) async fn upsert_header(
                    conn: &mut AsyncPgConnection,
                    header: &DocumentHeader,
                    device: &Device,
                ) -> QueryResult<i64> {
                    diesel::insert_into($headers::table)
                        .values(&HeaderRow::new(header, device))
                        .on_conflict($headers::number)
                        .do_update()
                        .set((
                            $headers::account_id.eq(excluded($headers::account_id)),
                            $headers::device_id.eq(excluded($headers::device_id)),
                            $headers::client_code.eq(excluded($headers::client_code)),
                            $headers::issued_on.eq(excluded($headers::issued_on)),
                            $headers::issued_at_time.eq(excluded($headers::issued_at_time)),
                            $headers::total_excl_tax.eq(excluded($headers::total_excl_tax)),
                            $headers::total_tax.eq(excluded($headers::total_tax)),
                            $headers::stamp_duty.eq(excluded($headers::stamp_duty)),
                            $headers::discount.eq(excluded($headers::discount)),
                            $headers::amount_paid.eq(excluded($headers::amount_paid)),
                            $headers::latitude.eq(excluded($headers::latitude)),
                            $headers::longitude.eq(excluded($headers::longitude)),
                            $headers::delivered.eq(excluded($headers::delivered)),
                            $headers::exported_sale.eq(excluded($headers::exported_sale)),
                            $headers::blocked.eq(excluded($headers::blocked)),
                            $headers::is_imported.eq(excluded($headers::is_imported)),
                            $headers::is_exported.eq(excluded($headers::is_exported)),
                            $headers::line_generation.eq($headers::line_generation + 1_i64),
                            $headers::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning($headers::line_generation)
                        .get_result(conn)
                        .await
                }

                /// Write `lines` under `generation` and drop every other
                /// generation of the document. Returns lines written.
                pub(crate) async fn replace_lines(
                    conn: &mut AsyncPgConnection,
                    number: &DocumentNumber,
                    generation: i64,
                    lines: &[DocumentLine],
                ) -> QueryResult<u64> {
                    let rows: Vec<LineRow<'_>> = (1_i32..)
                        .zip(lines)
                        .map(|(line_number, line)| LineRow::new(number, generation, line_number, line))
                        .collect();
                    let mut written = 0_u64;
                    for chunk in rows.chunks(LINE_INSERT_CHUNK) {
                        let inserted = diesel::insert_into($lines::table)
                            .values(chunk)
                            .execute(conn)
                            .await?;
                        written += inserted as u64;
                    }
                    diesel::delete(
                        $lines::table
                            .filter($lines::document_number.eq(number.as_str()))
                            .filter($lines::generation.ne(generation)),
                    )
                    .execute(conn)
                    .await?;
                    Ok(written)
                }
            }
        )+
    };
}

document_tables! {
    sale_tables {
        headers: sale_headers,
        lines: sale_lines,
    },
    order_tables {
        headers: order_headers,
        lines: order_lines,
    },
}
