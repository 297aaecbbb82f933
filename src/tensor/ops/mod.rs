mod arithmetic;
mod matrix;
mod others;
