mod envelope;
mod face;
