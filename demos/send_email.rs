/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use mail_compose::{Email, Multipart, Part};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Compose a message with a text and an HTML alternative
    let mut email = Email::new();
    email
        .set_host_name("smtp.gmail.com")
        .set_ssl_on_connect(true)
        .set_authentication("john", "p4ssw0rd");
    email
        .set_from_named("john@example.com", "John Doe")
        .unwrap()
        .add_to_named("jane@example.com", "Jane Doe")
        .unwrap()
        .add_cc("james@test.com")
        .unwrap();
    email.set_subject("Hi!").set_multipart_content(
        Multipart::alternative()
            .part(Part::text("text/plain", "Hello world!"))
            .part(Part::text("text/html", "<h1>Hello, world!</h1>")),
    );

    // Builds the message once and delivers it over implicit TLS.
    let message_id = email.send().await.unwrap();
    println!("Delivered {}", message_id);
}
